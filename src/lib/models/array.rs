use ndarray::{Array4, ArrayD};
use serde_derive::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::{constants::MAX_RANK, helpers::format_dims, helpers::H5OutError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
pub enum ElementType {
    #[strum(serialize = "f32")]
    #[serde(rename = "f32")]
    F32,
    #[strum(serialize = "f64")]
    #[serde(rename = "f64")]
    F64,
}

/// Logical shape of a stored array: (count, channels, height, width)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shape {
    pub count: usize,
    pub channels: usize,
    pub height: usize,
    pub width: usize,
}

impl Shape {
    pub fn new(count: usize, channels: usize, height: usize, width: usize) -> Self {
        Self {
            count,
            channels,
            height,
            width,
        }
    }

    /// Builds a shape from up to four dimensions, padding the missing trailing ones with 1.
    /// Returns `None` for rank > 4.
    pub fn from_dims(dims: &[usize]) -> Option<Self> {
        if dims.len() > MAX_RANK {
            return None;
        }
        let mut padded = [1usize; MAX_RANK];
        padded[..dims.len()].copy_from_slice(dims);
        Some(Self::new(padded[0], padded[1], padded[2], padded[3]))
    }

    pub fn dims(&self) -> [usize; MAX_RANK] {
        [self.count, self.channels, self.height, self.width]
    }

    /// Number of elements of a single sample
    pub fn datum_dim(&self) -> usize {
        self.channels * self.height * self.width
    }

    pub fn len(&self) -> usize {
        self.count * self.datum_dim()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<(usize, usize, usize, usize)> for Shape {
    fn from((count, channels, height, width): (usize, usize, usize, usize)) -> Self {
        Self::new(count, channels, height, width)
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", format_dims(&self.dims()))
    }
}

/// Element types the container can hold
pub trait Element: Copy + Default + 'static {
    const ELEMENT_TYPE: ElementType;

    fn wrap(values: Array4<Self>) -> ArrayData;
}

impl Element for f32 {
    const ELEMENT_TYPE: ElementType = ElementType::F32;

    fn wrap(values: Array4<Self>) -> ArrayData {
        ArrayData::F32(values)
    }
}

impl Element for f64 {
    const ELEMENT_TYPE: ElementType = ElementType::F64;

    fn wrap(values: Array4<Self>) -> ArrayData {
        ArrayData::F64(values)
    }
}

/// Dense rank-4 tensor in single or double precision
#[derive(Debug, Clone, PartialEq)]
pub enum ArrayData {
    F32(Array4<f32>),
    F64(Array4<f64>),
}

impl ArrayData {
    pub fn zeros(shape: Shape, element_type: ElementType) -> Self {
        match element_type {
            ElementType::F32 => ArrayData::F32(Array4::zeros(shape.dims())),
            ElementType::F64 => ArrayData::F64(Array4::zeros(shape.dims())),
        }
    }

    /// Wraps a row-major buffer of `shape.len()` elements
    pub fn from_shape_vec<T: Element>(
        shape: Shape,
        values: Vec<T>,
    ) -> Result<Self, ndarray::ShapeError> {
        Array4::from_shape_vec(shape.dims(), values).map(T::wrap)
    }

    /// Converts an array of rank 0 to 4, padding trailing dimensions with 1
    pub fn from_dyn<T: Element>(values: &ArrayD<T>) -> Option<Self> {
        let shape = Shape::from_dims(values.shape())?;
        let values: Vec<T> = values.iter().copied().collect();
        Self::from_shape_vec(shape, values).ok()
    }

    pub fn shape(&self) -> Shape {
        let (count, channels, height, width) = match self {
            ArrayData::F32(values) => values.dim(),
            ArrayData::F64(values) => values.dim(),
        };
        Shape::new(count, channels, height, width)
    }

    /// Leading (sample count) dimension
    pub fn count(&self) -> usize {
        self.shape().count
    }

    pub fn element_type(&self) -> ElementType {
        match self {
            ArrayData::F32(_) => ElementType::F32,
            ArrayData::F64(_) => ElementType::F64,
        }
    }

    pub fn as_f32(&self) -> Option<&Array4<f32>> {
        match self {
            ArrayData::F32(values) => Some(values),
            ArrayData::F64(_) => None,
        }
    }

    pub fn as_f64(&self) -> Option<&Array4<f64>> {
        match self {
            ArrayData::F64(values) => Some(values),
            ArrayData::F32(_) => None,
        }
    }

    /// Copies `source` into `staged`, reusing its storage when shape and element type match
    pub(crate) fn restage(staged: Option<ArrayData>, source: &ArrayData) -> ArrayData {
        match (staged, source) {
            (Some(ArrayData::F32(target)), ArrayData::F32(source)) => {
                ArrayData::F32(copy_rows(Some(target), source))
            }
            (Some(ArrayData::F64(target)), ArrayData::F64(source)) => {
                ArrayData::F64(copy_rows(Some(target), source))
            }
            (_, ArrayData::F32(source)) => ArrayData::F32(copy_rows(None, source)),
            (_, ArrayData::F64(source)) => ArrayData::F64(copy_rows(None, source)),
        }
    }
}

impl From<Array4<f32>> for ArrayData {
    fn from(values: Array4<f32>) -> Self {
        ArrayData::F32(values)
    }
}

impl From<Array4<f64>> for ArrayData {
    fn from(values: Array4<f64>) -> Self {
        ArrayData::F64(values)
    }
}

fn copy_rows<T: Element>(target: Option<Array4<T>>, source: &Array4<T>) -> Array4<T> {
    let mut target = match target {
        Some(target) if target.dim() == source.dim() => target,
        _ => Array4::from_elem(source.dim(), T::default()),
    };
    for (mut row, source_row) in target.outer_iter_mut().zip(source.outer_iter()) {
        row.assign(&source_row);
    }
    target
}

/// An array handed over by the host, together with the name it had upstream
#[derive(Debug, Clone, PartialEq)]
pub struct NamedArray {
    name: String,
    data: ArrayData,
}

impl NamedArray {
    pub fn new(name: impl Into<String>, data: impl Into<ArrayData>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    pub fn from_shape_vec<T: Element>(
        name: impl Into<String>,
        shape: impl Into<Shape>,
        values: Vec<T>,
    ) -> Result<Self, H5OutError> {
        let name = name.into();
        let shape = shape.into();
        let data = ArrayData::from_shape_vec(shape, values).map_err(|err| {
            H5OutError::InvalidArray {
                name: name.clone(),
                reason: format!("cannot build {} {shape} array: {err}", T::ELEMENT_TYPE),
            }
        })?;
        Ok(Self { name, data })
    }

    pub fn from_dyn<T: Element>(
        name: impl Into<String>,
        values: &ArrayD<T>,
    ) -> Result<Self, H5OutError> {
        let name = name.into();
        let data = ArrayData::from_dyn(values).ok_or_else(|| H5OutError::InvalidArray {
            name: name.clone(),
            reason: format!("rank {} exceeds {MAX_RANK}", values.ndim()),
        })?;
        Ok(Self { name, data })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data(&self) -> &ArrayData {
        &self.data
    }

    pub fn shape(&self) -> Shape {
        self.data.shape()
    }

    pub fn count(&self) -> usize {
        self.data.count()
    }
}
