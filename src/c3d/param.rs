//! Tagged C3D parameter values.
//!
//! C3D stores every parameter as an n-dimensional array. Whether a value is a
//! scalar or a sequence is decided exactly once, when the value is built, so
//! ingestion code reads the tag instead of checking lengths at each use.

use serde::Serialize;
use std::collections::BTreeMap;

/// Parameters of one group (or one header section), keyed by name.
pub type ParameterMap = BTreeMap<String, ParamValue>;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Int(i64),
    Float(f64),
    Text(String),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SequenceData {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
    Texts(Vec<String>),
}

impl SequenceData {
    pub fn len(&self) -> usize {
        match self {
            SequenceData::Ints(v) => v.len(),
            SequenceData::Floats(v) => v.len(),
            SequenceData::Texts(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Multi-element value. `dims` follows C3D (first dimension varies fastest).
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sequence {
    pub dims: Vec<usize>,
    pub data: SequenceData,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Scalar(Scalar),
    Sequence(Sequence),
}

impl ParamValue {
    /// Integer value; one element resolves to a scalar.
    pub fn ints(dims: Vec<usize>, mut values: Vec<i64>) -> Self {
        if values.len() == 1 {
            ParamValue::Scalar(Scalar::Int(values.remove(0)))
        } else {
            ParamValue::Sequence(Sequence {
                dims,
                data: SequenceData::Ints(values),
            })
        }
    }

    /// Float value; one element resolves to a scalar.
    pub fn floats(dims: Vec<usize>, mut values: Vec<f64>) -> Self {
        if values.len() == 1 {
            ParamValue::Scalar(Scalar::Float(values.remove(0)))
        } else {
            ParamValue::Sequence(Sequence {
                dims,
                data: SequenceData::Floats(values),
            })
        }
    }

    /// Text value; a single string resolves to a scalar.
    ///
    /// `dims` are the dimensions of the string array, without the
    /// character-length dimension.
    pub fn texts(dims: Vec<usize>, mut values: Vec<String>) -> Self {
        if values.len() == 1 {
            ParamValue::Scalar(Scalar::Text(values.remove(0)))
        } else {
            ParamValue::Sequence(Sequence {
                dims,
                data: SequenceData::Texts(values),
            })
        }
    }

    pub fn int(value: i64) -> Self {
        ParamValue::Scalar(Scalar::Int(value))
    }

    pub fn float(value: f64) -> Self {
        ParamValue::Scalar(Scalar::Float(value))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, ParamValue::Scalar(_))
    }

    pub fn len(&self) -> usize {
        match self {
            ParamValue::Scalar(_) => 1,
            ParamValue::Sequence(seq) => seq.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dimensions of a sequence; empty for scalars.
    pub fn dims(&self) -> &[usize] {
        match self {
            ParamValue::Scalar(_) => &[],
            ParamValue::Sequence(seq) => &seq.dims,
        }
    }

    /// Numeric scalar as f64. Sequences and text return `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Scalar(Scalar::Int(v)) => Some(*v as f64),
            ParamValue::Scalar(Scalar::Float(v)) => Some(*v),
            _ => None,
        }
    }

    /// Integral scalar as i64. Floats are accepted when they hold a whole number.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ParamValue::Scalar(Scalar::Int(v)) => Some(*v),
            ParamValue::Scalar(Scalar::Float(v)) if v.fract() == 0.0 && v.is_finite() => {
                Some(*v as i64)
            }
            _ => None,
        }
    }

    pub fn as_usize(&self) -> Option<usize> {
        self.as_i64().and_then(|v| usize::try_from(v).ok())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ParamValue::Scalar(Scalar::Text(s)) => Some(s),
            _ => None,
        }
    }

    /// Text content as a list; a scalar string is a list of one.
    pub fn to_texts(&self) -> Option<Vec<String>> {
        match self {
            ParamValue::Scalar(Scalar::Text(s)) => Some(vec![s.clone()]),
            ParamValue::Sequence(Sequence {
                data: SequenceData::Texts(v),
                ..
            }) => Some(v.clone()),
            _ => None,
        }
    }

    /// Numeric content as a flat list; a numeric scalar is a list of one.
    pub fn to_floats(&self) -> Option<Vec<f64>> {
        match self {
            ParamValue::Scalar(Scalar::Int(v)) => Some(vec![*v as f64]),
            ParamValue::Scalar(Scalar::Float(v)) => Some(vec![*v]),
            ParamValue::Sequence(Sequence {
                data: SequenceData::Ints(v),
                ..
            }) => Some(v.iter().map(|&x| x as f64).collect()),
            ParamValue::Sequence(Sequence {
                data: SequenceData::Floats(v),
                ..
            }) => Some(v.clone()),
            _ => None,
        }
    }
}
