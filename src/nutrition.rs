use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Energy and macronutrient quantities, in kcal and grams.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Macros {
    pub kcal: i32,
    pub proteins: i32,
    pub carbs: i32,
    pub fats: i32,
}

impl Macros {
    pub const ZERO: Macros = Macros {
        kcal: 0,
        proteins: 0,
        carbs: 0,
        fats: 0,
    };

    pub fn new(kcal: i32, proteins: i32, carbs: i32, fats: i32) -> Self {
        Self {
            kcal,
            proteins,
            carbs,
            fats,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    /// Rejects negative quantities.
    pub fn ensure_non_negative(&self) -> AppResult<()> {
        for (name, value) in self.fields() {
            if value < 0 {
                return Err(AppError::invalid(format!("{name} must not be negative")));
            }
        }
        Ok(())
    }

    pub fn checked_add(&self, other: &Macros) -> AppResult<Macros> {
        let add = |a: i32, b: i32, name: &str| {
            a.checked_add(b)
                .ok_or_else(|| AppError::invalid(format!("{name} total overflows")))
        };
        Ok(Macros {
            kcal: add(self.kcal, other.kcal, "kcal")?,
            proteins: add(self.proteins, other.proteins, "proteins")?,
            carbs: add(self.carbs, other.carbs, "carbs")?,
            fats: add(self.fats, other.fats, "fats")?,
        })
    }

    /// Applies `value * num / den` to every field with truncating division.
    pub(crate) fn rescale(&self, num: i64, den: i64) -> AppResult<Macros> {
        if den <= 0 {
            return Err(AppError::invalid("grams must be greater than zero"));
        }
        let scale = |value: i32, name: &str| {
            let scaled = i64::from(value) * num / den;
            i32::try_from(scaled)
                .map_err(|_| AppError::invalid(format!("{name} is out of range after scaling")))
        };
        Ok(Macros {
            kcal: scale(self.kcal, "kcal")?,
            proteins: scale(self.proteins, "proteins")?,
            carbs: scale(self.carbs, "carbs")?,
            fats: scale(self.fats, "fats")?,
        })
    }

    fn fields(&self) -> [(&'static str, i32); 4] {
        [
            ("kcal", self.kcal),
            ("proteins", self.proteins),
            ("carbs", self.carbs),
            ("fats", self.fats),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checked_add_is_componentwise() {
        let a = Macros::new(100, 10, 20, 5);
        let b = Macros::new(50, 1, 2, 3);
        assert_eq!(a.checked_add(&b).unwrap(), Macros::new(150, 11, 22, 8));
    }

    #[test]
    fn checked_add_rejects_overflow() {
        let a = Macros::new(i32::MAX, 0, 0, 0);
        let err = a.checked_add(&Macros::new(1, 0, 0, 0)).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg.contains("kcal")));
    }

    #[test]
    fn negative_fields_are_rejected() {
        assert!(Macros::new(0, 0, 0, 0).ensure_non_negative().is_ok());
        let err = Macros::new(10, 0, -1, 0).ensure_non_negative().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(msg) if msg.contains("carbs")));
    }

    #[test]
    fn rescale_truncates_toward_zero() {
        let m = Macros::new(7, 3, 1, 0);
        assert_eq!(m.rescale(1, 2).unwrap(), Macros::new(3, 1, 0, 0));
    }
}
