use std::io::{BufRead, Write};
use std::str::FromStr;

use anyhow::Result;
use getopts::{Matches, Options};
use strum::VariantNames;

use diet_plan::profile::{parse_choice, DIETARY_PREFERENCE, GENDER, GOAL};
use diet_plan::{DietaryPreference, Gender, Goal, ProfileForm};

pub fn options() -> Options {
    let mut opts = Options::new();
    opts.optopt("a", "age", "age in years, 1 to 119", "YEARS");
    opts.optopt("g", "gender", "Male, Female or Other", "GENDER");
    opts.optopt("t", "height", "height in cm, 51 to 299", "CM");
    opts.optopt("w", "weight", "weight in kg, 21 to 499", "KG");
    opts.optopt("d", "diet", "dietary preference: VEG or NON-VEG", "PREFERENCE");
    opts.optopt(
        "o",
        "goal",
        "Weight Loss, Muscle Gain, Maintenance or General Health",
        "GOAL",
    );
    opts.optopt("l", "allergies", "food allergies, blank for none", "TEXT");
    opts.optopt("m", "conditions", "medical conditions, blank for none", "TEXT");
    opts.optopt("v", "flow-version", "diet flow version to run", "X.Y.Z");
    opts.optopt("c", "config", "JSON settings file", "FILE");
    opts.optopt("O", "output-dir", "directory to save diet_plan.txt in", "DIR");
    opts.optflag("n", "no-save", "do not save diet_plan.txt");
    opts.optflag("y", "non-interactive", "never prompt for missing values");
    opts.optflag("h", "help", "print this help menu");
    opts
}

/// Asks for whatever the command line did not provide, the way the form
/// would. With `interactive` off, missing values stay missing.
pub struct Prompter<R, W> {
    input: R,
    output: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Prompter<R, W> {
    pub fn new(input: R, output: W, interactive: bool) -> Prompter<R, W> {
        Prompter {
            input,
            output,
            interactive,
        }
    }

    // None once input is exhausted.
    fn ask(&mut self, label: &str) -> Result<Option<String>> {
        write!(self.output, "{}: ", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(String::from(line.trim_end_matches(&['\r', '\n'][..]))))
    }

    fn text(&mut self, given: Option<String>, label: &str) -> Result<Option<String>> {
        match given {
            Some(value) => Ok(Some(value)),
            None if self.interactive => self.ask(label),
            None => Ok(None),
        }
    }

    /// Re-asks until the answer is one of the choices; blank picks the first.
    fn choice<T>(&mut self, field: &'static str, given: Option<String>) -> Result<Option<String>>
    where
        T: FromStr + VariantNames + ToString,
    {
        if given.is_some() || !self.interactive {
            return Ok(given);
        }
        let default = T::VARIANTS.first().copied().unwrap_or_default();
        let label = format!("{} [{}] ({})", field, T::VARIANTS.join(" / "), default);
        loop {
            match self.ask(&label)? {
                None => return Ok(None),
                Some(answer) if answer.trim().is_empty() => return Ok(Some(String::from(default))),
                Some(answer) => match parse_choice::<T>(field, &answer) {
                    Ok(choice) => return Ok(Some(choice.to_string())),
                    Err(e) => writeln!(self.output, "{}", e)?,
                },
            }
        }
    }

    pub fn collect(&mut self, matches: &Matches) -> Result<ProfileForm> {
        Ok(ProfileForm {
            age: self.text(matches.opt_str("age"), "Age (years)")?,
            gender: self.choice::<Gender>(GENDER, matches.opt_str("gender"))?,
            height: self.text(matches.opt_str("height"), "Height (cm)")?,
            weight: self.text(matches.opt_str("weight"), "Weight (kg)")?,
            dietary_preference: self
                .choice::<DietaryPreference>(DIETARY_PREFERENCE, matches.opt_str("diet"))?,
            goal: self.choice::<Goal>(GOAL, matches.opt_str("goal"))?,
            food_allergies: self.text(
                matches.opt_str("allergies"),
                "Food Allergies (leave blank if none)",
            )?,
            medical_conditions: self.text(
                matches.opt_str("conditions"),
                "Medical Conditions (leave blank if none)",
            )?,
        })
    }
}
