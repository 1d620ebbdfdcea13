//! Field shapes and experience records.
//!
//! Every run declares one shape per named field at store construction time,
//! derived from the model's input/output accessors. All appended records must
//! match those shapes exactly for the lifetime of the run; a disagreement is
//! a configuration error, not something the pipeline recovers from.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Dense numeric tensor: a flat buffer plus its shape.
///
/// Scalars are rank-0 tensors (empty shape, one element).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Create a zero-filled tensor of the given shape.
    pub fn zeros(shape: &[usize]) -> Self {
        Self {
            shape: shape.to_vec(),
            data: vec![0.0; numel(shape)],
        }
    }

    /// Create a tensor from a flat buffer.
    ///
    /// # Panics
    ///
    /// Panics if `data.len()` disagrees with the element count implied by
    /// `shape`. Shape/buffer agreement is the caller's construction contract.
    pub fn from_vec(shape: Vec<usize>, data: Vec<f32>) -> Self {
        assert_eq!(
            numel(&shape),
            data.len(),
            "tensor shape {:?} implies {} elements, got {}",
            shape,
            numel(&shape),
            data.len()
        );
        Self { shape, data }
    }

    /// Create a rank-1 tensor from a vector.
    pub fn from_flat(data: Vec<f32>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Create a rank-0 (scalar) tensor.
    pub fn scalar(value: f32) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Tensor shape.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat element buffer.
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Element count implied by a shape (1 for the empty/scalar shape).
pub(crate) fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// The named fields of one experience record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    /// Spatial game observation.
    Spatial,
    /// Non-spatial feature vector.
    Extra,
    /// Chosen action vector.
    Action,
    /// Validity mask over action dimensions (same shape as action).
    Mask,
    /// Reference/expert action (same shape as action, may be zero).
    TeacherAction,
    /// Creation tick ordinal, stored as a scalar.
    Time,
}

impl Field {
    /// All fields in declaration order.
    pub const ALL: [Field; 6] = [
        Field::Spatial,
        Field::Extra,
        Field::Action,
        Field::Mask,
        Field::TeacherAction,
        Field::Time,
    ];

    /// Stable field name for logs and keyed batches.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Spatial => "spatial",
            Field::Extra => "extra",
            Field::Action => "action",
            Field::Mask => "mask",
            Field::TeacherAction => "teacher_action",
            Field::Time => "time",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-field shape declaration for one run.
///
/// Mask and teacher action always share the action shape, and time is a
/// scalar, so only the three independent shapes are stored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeDict {
    spatial: Vec<usize>,
    extra: Vec<usize>,
    action: Vec<usize>,
}

impl ShapeDict {
    /// Declare shapes explicitly.
    pub fn new(spatial: Vec<usize>, extra: Vec<usize>, action: Vec<usize>) -> Self {
        Self {
            spatial,
            extra,
            action,
        }
    }

    /// Build the dictionary from a model's declared dimensions.
    pub fn for_model(model: &dyn crate::model::Model) -> Self {
        let (spatial, extra) = model.input_state_dimension();
        let action = model.output_dimension();
        Self::new(spatial, extra, action)
    }

    /// Declared shape of one field. Time is the empty (scalar) shape.
    pub fn shape(&self, field: Field) -> &[usize] {
        match field {
            Field::Spatial => &self.spatial,
            Field::Extra => &self.extra,
            Field::Action | Field::Mask | Field::TeacherAction => &self.action,
            Field::Time => &[],
        }
    }

    /// Element count of one field's record slot.
    pub fn numel(&self, field: Field) -> usize {
        numel(self.shape(field))
    }

    /// Action vector length.
    pub fn action_len(&self) -> usize {
        numel(&self.action)
    }
}

/// One producer-to-consumer record: a single tick's experience.
#[derive(Clone, Debug, PartialEq)]
pub struct ExperienceTuple {
    pub spatial: Tensor,
    pub extra: Tensor,
    pub action: Tensor,
    pub mask: Tensor,
    pub teacher_action: Tensor,
    pub time: f32,
}

impl ExperienceTuple {
    /// Build a record, defaulting an absent mask to all-ones and an absent
    /// teacher action to zeros (both in the action's shape).
    pub fn from_parts(
        spatial: Tensor,
        extra: Tensor,
        action: Vec<f32>,
        mask: Option<Vec<f32>>,
        teacher_action: Option<Vec<f32>>,
        time: f32,
    ) -> Self {
        let action_len = action.len();
        let mask = mask.unwrap_or_else(|| vec![1.0; action_len]);
        let teacher_action = teacher_action.unwrap_or_else(|| vec![0.0; action_len]);
        Self {
            spatial,
            extra,
            action: Tensor::from_flat(action),
            mask: Tensor::from_flat(mask),
            teacher_action: Tensor::from_flat(teacher_action),
            time,
        }
    }

    /// Shape of one field as stored in this record.
    pub fn shape_of(&self, field: Field) -> &[usize] {
        match field {
            Field::Spatial => self.spatial.shape(),
            Field::Extra => self.extra.shape(),
            Field::Action => self.action.shape(),
            Field::Mask => self.mask.shape(),
            Field::TeacherAction => self.teacher_action.shape(),
            Field::Time => &[],
        }
    }

    /// Append one field's elements to a flat stacking buffer.
    pub(crate) fn copy_field(&self, field: Field, out: &mut Vec<f32>) {
        match field {
            Field::Spatial => out.extend_from_slice(self.spatial.data()),
            Field::Extra => out.extend_from_slice(self.extra.data()),
            Field::Action => out.extend_from_slice(self.action.data()),
            Field::Mask => out.extend_from_slice(self.mask.data()),
            Field::TeacherAction => out.extend_from_slice(self.teacher_action.data()),
            Field::Time => out.push(self.time),
        }
    }
}

/// A sampled mini-batch, keyed by field.
///
/// Each field tensor has shape `[batch_size, *field_shape]` and the keys
/// cover exactly the declared shape dictionary.
#[derive(Clone, Debug)]
pub struct SampleBatch {
    batch_size: usize,
    fields: HashMap<Field, Tensor>,
}

impl SampleBatch {
    pub(crate) fn new(batch_size: usize, fields: HashMap<Field, Tensor>) -> Self {
        debug_assert_eq!(fields.len(), Field::ALL.len());
        Self { batch_size, fields }
    }

    /// Number of records in the batch.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Stacked tensor for one field.
    pub fn get(&self, field: Field) -> Option<&Tensor> {
        self.fields.get(&field)
    }

    /// Iterate over all field tensors.
    pub fn iter(&self) -> impl Iterator<Item = (&Field, &Tensor)> {
        self.fields.iter()
    }
}
