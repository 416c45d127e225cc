use std::fmt;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Class {
    #[default]
    In,
    Ch,
    Hs,
    Unknown(u16),
}

impl From<u16> for Class {
    fn from(value: u16) -> Self {
        match value {
            1 => Class::In,
            3 => Class::Ch,
            4 => Class::Hs,
            other => Class::Unknown(other),
        }
    }
}

impl From<Class> for u16 {
    fn from(value: Class) -> Self {
        match value {
            Class::In => 1,
            Class::Ch => 3,
            Class::Hs => 4,
            Class::Unknown(other) => other,
        }
    }
}

impl fmt::Display for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Class::In => f.write_str("IN"),
            Class::Ch => f.write_str("CH"),
            Class::Hs => f.write_str("HS"),
            Class::Unknown(value) => write!(f, "CLASS{}", value),
        }
    }
}
