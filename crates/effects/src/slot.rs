//! Opaque per-slot effect data.

use battlefx_core::{FrameMultiplier, ScaleError};
use serde::{Deserialize, Serialize};

/// `state` value marking a slot as finished.
pub const DONE: u16 = 0xFFFF;

/// Data block owned by one effect slot.
///
/// Field meaning is routine specific. `state` is written with the
/// reservation counter on registration and set to [`DONE`] by the routine
/// when it is finished.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[allow(missing_docs)]
pub struct EffectData {
    pub state: u16,
    pub aux: i16,
    pub frames: u16,
    pub word_06: i16,
    pub actor: u16,
    pub word_0a: i16,
    pub word_0c: i16,
    pub word_0e: i16,
    pub word_10: i16,
    pub word_12: i16,
    pub word_14: i16,
    pub word_16: i16,
    pub byte_18: u8,
    pub byte_19: u8,
    pub byte_1a: u8,
    pub byte_1b: u8,
}

/// Fields of [`EffectData`] that rescale rules may touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum DataField {
    Aux,
    Frames,
    Word06,
    Word0A,
    Word0C,
    Word0E,
    Word14,
    Byte18,
    Byte19,
    Byte1A,
}

impl EffectData {
    /// Whether the routine has finished.
    pub fn is_done(&self) -> bool {
        self.state == DONE
    }

    /// Mark the routine finished. The slot is released after this tick.
    pub fn finish(&mut self) {
        self.state = DONE;
    }

    /// Multiply a duration field. On overflow the field saturates and the
    /// error is returned for reporting.
    pub fn stretch(&mut self, field: DataField, multiplier: FrameMultiplier) -> Result<(), ScaleError> {
        match field {
            DataField::Frames => {
                let scaled = multiplier.stretch_u16(self.frames);
                stretch_into(&mut self.frames, scaled, u16::MAX)
            }
            DataField::Aux => stretch_signed(&mut self.aux, multiplier),
            DataField::Word06 => stretch_signed(&mut self.word_06, multiplier),
            DataField::Word0A => stretch_signed(&mut self.word_0a, multiplier),
            DataField::Word0C => stretch_signed(&mut self.word_0c, multiplier),
            DataField::Word0E => stretch_signed(&mut self.word_0e, multiplier),
            DataField::Word14 => stretch_signed(&mut self.word_14, multiplier),
            DataField::Byte18 => {
                let scaled = multiplier.stretch_u8(self.byte_18);
                stretch_into(&mut self.byte_18, scaled, u8::MAX)
            }
            DataField::Byte19 => {
                let scaled = multiplier.stretch_u8(self.byte_19);
                stretch_into(&mut self.byte_19, scaled, u8::MAX)
            }
            DataField::Byte1A => {
                let scaled = multiplier.stretch_u8(self.byte_1a);
                stretch_into(&mut self.byte_1a, scaled, u8::MAX)
            }
        }
    }

    /// Divide a per-frame delta field, truncating toward zero.
    pub fn shrink(&mut self, field: DataField, multiplier: FrameMultiplier) {
        match field {
            DataField::Frames => self.frames /= u16::from(multiplier.get()),
            DataField::Aux => self.aux = multiplier.shrink_i16(self.aux),
            DataField::Word06 => self.word_06 = multiplier.shrink_i16(self.word_06),
            DataField::Word0A => self.word_0a = multiplier.shrink_i16(self.word_0a),
            DataField::Word0C => self.word_0c = multiplier.shrink_i16(self.word_0c),
            DataField::Word0E => self.word_0e = multiplier.shrink_i16(self.word_0e),
            DataField::Word14 => self.word_14 = multiplier.shrink_i16(self.word_14),
            DataField::Byte18 => self.byte_18 = multiplier.shrink_u8(self.byte_18),
            DataField::Byte19 => self.byte_19 = multiplier.shrink_u8(self.byte_19),
            DataField::Byte1A => self.byte_1a = multiplier.shrink_u8(self.byte_1a),
        }
    }
}

fn stretch_into<T>(field: &mut T, scaled: Result<T, ScaleError>, max: T) -> Result<(), ScaleError> {
    match scaled {
        Ok(value) => {
            *field = value;
            Ok(())
        }
        Err(err) => {
            *field = max;
            Err(err)
        }
    }
}

fn stretch_signed(field: &mut i16, multiplier: FrameMultiplier) -> Result<(), ScaleError> {
    match multiplier.stretch_i16(*field) {
        Ok(value) => {
            *field = value;
            Ok(())
        }
        Err(err) => {
            *field = if *field < 0 { i16::MIN } else { i16::MAX };
            Err(err)
        }
    }
}
