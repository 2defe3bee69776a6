use std::str::FromStr;

use strum::{Display, EnumString, VariantNames};

use crate::validation::{self, ValidationError};
use crate::FieldMap;

pub const AGE: &str = "Age";
pub const GOAL: &str = "Goal";
pub const GENDER: &str = "Gender";
pub const HEIGHT: &str = "Height";
pub const WEIGHT: &str = "Weight";
pub const DIETARY_PREFERENCE: &str = "Veg/Non-Veg";
pub const FOOD_ALLERGY: &str = "Food Allergy";
pub const MEDICAL_CONDITION: &str = "Medical Condition";

/// Sent in place of blank allergy and condition text.
pub const NONE_TEXT: &str = "None";

// "Other" is passed through as-is; how the flow treats it is up to the flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
pub enum Gender {
    Male,
    Female,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, VariantNames)]
pub enum Goal {
    #[strum(serialize = "Weight Loss")]
    WeightLoss,
    #[strum(serialize = "Muscle Gain")]
    MuscleGain,
    Maintenance,
    #[strum(serialize = "General Health")]
    GeneralHealth,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, VariantNames)]
pub enum DietaryPreference {
    #[default]
    #[strum(serialize = "VEG")]
    Veg,
    #[strum(serialize = "NON-VEG")]
    NonVeg,
}

/// Parses one of the fixed form choices, reporting the valid options on failure.
pub fn parse_choice<T>(field: &'static str, value: &str) -> Result<T, ValidationError>
where
    T: FromStr + VariantNames,
{
    T::from_str(value.trim()).map_err(|_| ValidationError::UnknownChoice {
        field,
        value: String::from(value),
        choices: T::VARIANTS.join(", "),
    })
}

/// Raw text as collected by a front end, before any checking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub age: Option<String>,
    pub gender: Option<String>,
    pub height: Option<String>,
    pub weight: Option<String>,
    pub goal: Option<String>,
    pub dietary_preference: Option<String>,
    pub food_allergies: Option<String>,
    pub medical_conditions: Option<String>,
}

impl ProfileForm {
    /// Builds the field map sent to the flow. Absent values stay absent so the
    /// validator can name them; blank free text becomes "None" and a missing
    /// dietary preference takes the form's default choice.
    pub fn into_fields(self) -> FieldMap {
        let mut fields = FieldMap::new();
        let entered = [
            (AGE, self.age),
            (GOAL, self.goal),
            (GENDER, self.gender),
            (HEIGHT, self.height),
            (WEIGHT, self.weight),
        ];
        for (name, value) in entered {
            if let Some(value) = value {
                fields.insert(String::from(name), value);
            }
        }
        let dietary_preference = match self.dietary_preference {
            Some(choice) if !choice.trim().is_empty() => choice,
            _ => DietaryPreference::default().to_string(),
        };
        fields.insert(String::from(DIETARY_PREFERENCE), dietary_preference);
        fields.insert(String::from(FOOD_ALLERGY), or_none(self.food_allergies));
        fields.insert(String::from(MEDICAL_CONDITION), or_none(self.medical_conditions));
        fields
    }
}

pub fn or_none(text: Option<String>) -> String {
    match text {
        Some(text) if !text.trim().is_empty() => text,
        _ => String::from(NONE_TEXT),
    }
}

/// Typed view of a validated field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub age: i64,
    pub gender: Gender,
    pub height_cm: f64,
    pub weight_kg: f64,
    pub goal: Goal,
    pub dietary_preference: DietaryPreference,
    pub food_allergies: String,
    pub medical_conditions: String,
}

impl Profile {
    pub fn from_fields(fields: &FieldMap) -> Result<Profile, ValidationError> {
        let measurements = validation::check_fields(fields)?;
        let text = |name: &str| fields.get(name).map(String::as_str).unwrap_or_default();

        let dietary_preference = match fields.get(DIETARY_PREFERENCE) {
            Some(value) if !value.trim().is_empty() => parse_choice(DIETARY_PREFERENCE, value)?,
            _ => {
                return Err(ValidationError::Missing {
                    field: DIETARY_PREFERENCE,
                })
            }
        };

        Ok(Profile {
            age: measurements.age,
            gender: parse_choice(GENDER, text(GENDER))?,
            height_cm: measurements.height_cm,
            weight_kg: measurements.weight_kg,
            goal: parse_choice(GOAL, text(GOAL))?,
            dietary_preference,
            food_allergies: or_none(fields.get(FOOD_ALLERGY).cloned()),
            medical_conditions: or_none(fields.get(MEDICAL_CONDITION).cloned()),
        })
    }
}
