use log::debug;
use serde_derive::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::{helpers::H5OutError, models::array::ArrayData};

/// Named roles an array can occupy in a batch. Slots fill in this order, without gaps.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Data,
    Label,
    Additional1,
    Additional2,
}

impl Slot {
    pub const ALL: [Slot; 4] = [
        Slot::Data,
        Slot::Label,
        Slot::Additional1,
        Slot::Additional2,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Slot at a given input position
    pub fn at(position: usize) -> Option<Slot> {
        Self::ALL.get(position).copied()
    }

    /// Data and label carry the batch size every other slot is checked against
    pub fn defines_batch_size(self) -> bool {
        matches!(self, Slot::Data | Slot::Label)
    }
}

/// Arrays staged for the current batch.
///
/// Populated slots always form a prefix of [`Slot::ALL`]. Storage is kept across
/// [`clear`](SlotBuffer::clear) calls and reused when the next batch has the same shape.
#[derive(Debug, Default)]
pub struct SlotBuffer {
    storage: [Option<ArrayData>; 4],
    len: usize,
}

impl SlotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deep-copies `array` into `slot`.
    pub fn stage(&mut self, slot: Slot, array: &ArrayData) -> Result<(), H5OutError> {
        let index = slot.index();
        if index > self.len {
            return Err(H5OutError::SlotOrderViolation {
                slot,
                missing: Slot::ALL[self.len],
            });
        }

        if let Some(expected) = self.batch_size_excluding(slot) {
            let got = array.count();
            if got != expected {
                return Err(H5OutError::ShapeMismatch {
                    slot,
                    expected,
                    got,
                });
            }
        }

        let staged = ArrayData::restage(self.storage[index].take(), array);
        debug!("Staged {} array {} into slot {}", staged.element_type(), staged.shape(), slot);
        self.storage[index] = Some(staged);
        if index == self.len {
            self.len += 1;
        }
        Ok(())
    }

    pub fn active_slots(&self) -> &[Slot] {
        &Slot::ALL[..self.len]
    }

    pub fn get(&self, slot: Slot) -> Option<&ArrayData> {
        if slot.index() < self.len {
            self.storage[slot.index()].as_ref()
        } else {
            None
        }
    }

    /// Active slots with their staged arrays, in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Slot, &ArrayData)> + '_ {
        self.active_slots()
            .iter()
            .filter_map(|slot| self.get(*slot).map(|array| (*slot, array)))
    }

    /// Leading dimension of the staged data/label arrays
    pub fn batch_size(&self) -> Option<usize> {
        self.active_slots()
            .iter()
            .filter(|slot| slot.defines_batch_size())
            .find_map(|slot| self.get(*slot).map(ArrayData::count))
    }

    fn batch_size_excluding(&self, excluded: Slot) -> Option<usize> {
        self.active_slots()
            .iter()
            .filter(|slot| slot.defines_batch_size() && **slot != excluded)
            .find_map(|slot| self.get(*slot).map(ArrayData::count))
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Data and label are both staged
    pub fn is_complete(&self) -> bool {
        self.len >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::array::{ElementType, Shape};

    fn zeros(count: usize, channels: usize) -> ArrayData {
        ArrayData::zeros(Shape::new(count, channels, 1, 1), ElementType::F32)
    }

    #[test]
    fn slot_names() {
        let names: Vec<&str> = Slot::ALL.iter().map(|slot| slot.as_ref()).collect();
        assert_eq!(names, vec!["data", "label", "additional1", "additional2"]);
        assert_eq!("additional2".parse::<Slot>().ok(), Some(Slot::Additional2));
    }

    #[test]
    fn input_positions_map_to_slots() {
        assert_eq!(Slot::at(0), Some(Slot::Data));
        assert_eq!(Slot::at(1), Some(Slot::Label));
        assert_eq!(Slot::at(3), Some(Slot::Additional2));
        assert_eq!(Slot::at(4), None);
        assert!(Slot::ALL
            .iter()
            .enumerate()
            .all(|(position, slot)| slot.index() == position));
    }

    #[test]
    fn stage_data_and_label() {
        let mut buffer = SlotBuffer::new();
        buffer.stage(Slot::Data, &zeros(4, 3)).expect("data first");
        buffer.stage(Slot::Label, &zeros(4, 1)).expect("label second");
        assert_eq!(buffer.active_slots(), &[Slot::Data, Slot::Label]);
        assert_eq!(buffer.batch_size(), Some(4));
        assert!(buffer.is_complete());
    }

    #[test]
    fn additional1_without_label_is_order_violation() {
        let mut buffer = SlotBuffer::new();
        buffer.stage(Slot::Data, &zeros(2, 1)).expect("data first");
        let result = buffer.stage(Slot::Additional1, &zeros(2, 1));
        assert!(matches!(
            result,
            Err(H5OutError::SlotOrderViolation {
                slot: Slot::Additional1,
                missing: Slot::Label
            })
        ));
        assert_eq!(buffer.active_slots(), &[Slot::Data]);
    }

    #[test]
    fn additional1_on_empty_buffer_is_order_violation() {
        let mut buffer = SlotBuffer::new();
        let result = buffer.stage(Slot::Additional1, &zeros(2, 1));
        assert!(matches!(
            result,
            Err(H5OutError::SlotOrderViolation {
                missing: Slot::Data,
                ..
            })
        ));
    }

    #[test]
    fn additional2_needs_additional1() {
        let mut buffer = SlotBuffer::new();
        buffer.stage(Slot::Data, &zeros(2, 1)).expect("data");
        buffer.stage(Slot::Label, &zeros(2, 1)).expect("label");
        let result = buffer.stage(Slot::Additional2, &zeros(2, 1));
        assert!(matches!(
            result,
            Err(H5OutError::SlotOrderViolation {
                missing: Slot::Additional1,
                ..
            })
        ));
    }

    #[test]
    fn leading_dimension_mismatch() {
        let mut buffer = SlotBuffer::new();
        buffer.stage(Slot::Data, &zeros(4, 3)).expect("data");
        let result = buffer.stage(Slot::Label, &zeros(3, 1));
        assert!(matches!(
            result,
            Err(H5OutError::ShapeMismatch {
                slot: Slot::Label,
                expected: 4,
                got: 3
            })
        ));

        buffer.stage(Slot::Label, &zeros(4, 1)).expect("label");
        let result = buffer.stage(Slot::Additional1, &zeros(5, 1));
        assert!(matches!(result, Err(H5OutError::ShapeMismatch { .. })));
    }

    #[test]
    fn restaging_data_is_checked_against_label() {
        let mut buffer = SlotBuffer::new();
        buffer.stage(Slot::Data, &zeros(4, 3)).expect("data");
        buffer.stage(Slot::Label, &zeros(4, 1)).expect("label");
        assert!(buffer.stage(Slot::Data, &zeros(2, 3)).is_err());
        buffer.stage(Slot::Data, &zeros(4, 7)).expect("same batch size");
        assert_eq!(buffer.len(), 2);
        assert_eq!(
            buffer.get(Slot::Data).map(ArrayData::shape),
            Some(Shape::new(4, 7, 1, 1))
        );
    }

    #[test]
    fn clear_hides_previous_batch() {
        let mut buffer = SlotBuffer::new();
        for slot in Slot::ALL {
            buffer.stage(slot, &zeros(2, 1)).expect("contiguous slots");
        }
        assert_eq!(buffer.len(), 4);

        buffer.clear();
        assert!(buffer.is_empty());
        assert!(buffer.get(Slot::Data).is_none());
        assert_eq!(buffer.batch_size(), None);

        buffer.stage(Slot::Data, &zeros(1, 1)).expect("data");
        buffer.stage(Slot::Label, &zeros(1, 1)).expect("label");
        assert_eq!(buffer.iter().count(), 2);
        assert!(buffer.get(Slot::Additional1).is_none());
    }
}
