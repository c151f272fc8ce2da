use serde::{Serialize, Deserialize};

use std::fmt;

use crate::{Error, Result};


/// The label of a pixel with respect to one ground-truth pair.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default,
    Serialize, Deserialize,
)]
pub enum GtClass {
    /// The pixel carries the positive value of the pair.
    Pos,
    /// The pixel carries the negative value of the pair.
    Neg,
    /// The pixel belongs to neither class of the pair.
    #[default]
    Ignore,
}


impl GtClass {
    /// Returns the raw integer value of the class
    /// (`1`, `-1` and `0`).
    #[inline]
    pub fn raw(self) -> i32 {
        match self {
            Self::Pos    =>  1,
            Self::Neg    => -1,
            Self::Ignore =>  0,
        }
    }


    /// Returns the boosting label `+1` / `-1` of a sampleable class.
    #[inline]
    pub fn label(self) -> Option<f64> {
        match self {
            Self::Pos    => Some(1f64),
            Self::Neg    => Some(-1f64),
            Self::Ignore => None,
        }
    }


    /// Label a raw ground-truth value against a `(negative, positive)` pair.
    #[inline]
    pub fn from_pair(value: i32, (negative, positive): (i32, i32)) -> Self {
        if value == positive {
            Self::Pos
        } else if value == negative {
            Self::Neg
        } else {
            Self::Ignore
        }
    }
}


impl TryFrom<i32> for GtClass {
    type Error = Error;
    fn try_from(raw: i32) -> Result<Self> {
        match raw {
             1 => Ok(Self::Pos),
            -1 => Ok(Self::Neg),
             0 => Ok(Self::Ignore),
             _ => Err(Error::InvalidClass(raw)),
        }
    }
}


impl fmt::Display for GtClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pos    => "POS",
            Self::Neg    => "NEG",
            Self::Ignore => "IGN",
        };
        write!(f, "{name}")
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pair_01() {
        let pair = (0, 255);
        assert_eq!(GtClass::Pos, GtClass::from_pair(255, pair));
        assert_eq!(GtClass::Neg, GtClass::from_pair(0, pair));
        assert_eq!(GtClass::Ignore, GtClass::from_pair(128, pair));
    }

    #[test]
    fn test_try_from_01() {
        for class in [GtClass::Pos, GtClass::Neg, GtClass::Ignore] {
            let res = GtClass::try_from(class.raw()).unwrap();
            assert_eq!(class, res, "expected {class}, got {res}.");
        }
        assert!(GtClass::try_from(2).is_err());
    }
}
