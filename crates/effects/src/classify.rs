//! Effect identities and their timing classification.

use serde::{Deserialize, Serialize};

use crate::decorator::DecoratorKind;
use crate::slot::DataField;
use crate::table::TableKind;
use self::Rescale::{OdinSteelFrames, Shrink, Stretch};
use crate::slot::DataField::{
    Aux, Byte18, Byte19, Byte1A, Frames, Word06, Word0A, Word0C, Word0E, Word14,
};

/// Symbolic identity of an effect routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum EffectId {
    // 100 table
    ActionText,
    Routine425D29,
    Routine5BDA0F,
    TifaLimit12,
    TifaLimit21,
    OdinSteel,
    EnemyDeath,
    IainukiDeath,
    BossDeath,
    MeltingDeath,
    DisintegrateDeath,
    MorphDeath,
    SummonAnimation,
    VincentLimitFade,
    BahamutZeroLoop,
    KotrCamera,
    // 60 table
    Routine4276B6,
    Routine4255B7,
    Routine427737,
    Routine425AAD,
    Routine427AF1,
    Routine4277B1,
    Routine5BD96D,
    Routine425E5F,
    Routine5C1C8F,
    Routine5BCF9D,
    Routine425520,
    BossDeathShake,
    Routine5BCD42,
    DamageDisplay,
    MagicAura,
    LimitBreakAura,
    EnemySkillAura,
    SummonAura,
    Routine5C18BC,
    SmokeMove,
    // 10 table
    RestingPosition,
    RestingPositionXz,
    RestingRotationY,
    RestingPositionY,
    MoveToTarget,
    MoveToTargetArc,
    MoveCharacterStep,
    LimitMoveToTarget,
    DisintegrateStep,
    /// Any routine without a dedicated identity.
    Custom(u32),
}

/// One data adjustment applied on a slot's first tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rescale {
    /// Multiply a duration field by the multiplier.
    Stretch(DataField),
    /// Divide a per-frame delta field by the multiplier.
    Shrink(DataField),
    /// Set the battle's Odin Steel frame count to its base times the multiplier.
    OdinSteelFrames,
}

/// Outcome of classifying an effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    /// Decorator the slot runs under.
    pub decorator: DecoratorKind,
    /// Adjustments applied once before the first invocation.
    pub rescale: &'static [Rescale],
}

const STRETCH_FRAMES: &[Rescale] = &[Stretch(Frames)];

const NO_OP_100: &[EffectId] = &[
    EffectId::EnemyDeath,
    EffectId::IainukiDeath,
    EffectId::BossDeath,
    EffectId::MeltingDeath,
    EffectId::DisintegrateDeath,
    EffectId::MorphDeath,
    EffectId::SummonAnimation,
    EffectId::VincentLimitFade,
];

const NO_OP_60: &[EffectId] = &[
    EffectId::Routine425E5F,
    EffectId::Routine5C1C8F,
    EffectId::Routine5BCF9D,
    EffectId::Routine425520,
    EffectId::BossDeathShake,
    EffectId::Routine5BCD42,
    EffectId::DamageDisplay,
    EffectId::MagicAura,
    EffectId::LimitBreakAura,
    EffectId::EnemySkillAura,
    EffectId::SummonAura,
    EffectId::Routine5C18BC,
];

fn rescale_100(id: EffectId) -> Option<&'static [Rescale]> {
    let rules: &'static [Rescale] = match id {
        EffectId::ActionText => &[Stretch(Word06)],
        EffectId::Routine425D29 => STRETCH_FRAMES,
        EffectId::Routine5BDA0F => &[Shrink(Aux), Stretch(Frames)],
        EffectId::TifaLimit12 | EffectId::TifaLimit21 => &[Stretch(Byte1A)],
        EffectId::OdinSteel => &[OdinSteelFrames],
        _ => return None,
    };
    Some(rules)
}

fn rescale_60(id: EffectId) -> Option<&'static [Rescale]> {
    let rules: &'static [Rescale] = match id {
        EffectId::Routine4276B6
        | EffectId::Routine4255B7
        | EffectId::Routine427737
        | EffectId::Routine425AAD
        | EffectId::Routine427AF1
        | EffectId::Routine4277B1 => STRETCH_FRAMES,
        EffectId::Routine5BD96D => &[Stretch(Frames), Shrink(Aux)],
        _ => return None,
    };
    Some(rules)
}

fn rescale_10(id: EffectId) -> &'static [Rescale] {
    match id {
        EffectId::RestingPosition => &[
            Stretch(Frames),
            Stretch(Byte18),
            Shrink(Word0C),
            Shrink(Word0E),
            Shrink(Word06),
        ],
        EffectId::RestingPositionXz => &[Stretch(Frames), Shrink(Word0A), Shrink(Word0C)],
        EffectId::RestingRotationY => &[Stretch(Frames), Shrink(Word0E)],
        EffectId::RestingPositionY => &[Stretch(Frames), Shrink(Word0A)],
        EffectId::MoveToTarget => &[
            Stretch(Frames),
            Stretch(Byte18),
            Shrink(Word0C),
            Shrink(Word0E),
        ],
        EffectId::MoveToTargetArc => &[
            Stretch(Frames),
            Stretch(Byte19),
            Stretch(Byte1A),
            Shrink(Word0C),
            Shrink(Word0E),
        ],
        EffectId::MoveCharacterStep => STRETCH_FRAMES,
        EffectId::LimitMoveToTarget => &[
            Stretch(Frames),
            Stretch(Byte19),
            Stretch(Byte1A),
            Shrink(Word0C),
            Shrink(Word0E),
            Shrink(Word14),
        ],
        _ => &[],
    }
}

/// Classify an effect registered on `table`. First match wins: rescaled
/// effects keep the pass-through decorator.
pub fn classify(table: TableKind, id: EffectId) -> Classification {
    let no_op = |rescale: &'static [Rescale]| Classification {
        decorator: DecoratorKind::NoOp,
        rescale,
    };
    match table {
        TableKind::Effect10 => no_op(rescale_10(id)),
        TableKind::Effect60 => {
            if let Some(rules) = rescale_60(id) {
                no_op(rules)
            } else if NO_OP_60.contains(&id) {
                no_op(&[])
            } else if id == EffectId::SmokeMove {
                Classification {
                    decorator: DecoratorKind::Throttled,
                    rescale: &[],
                }
            } else {
                Classification {
                    decorator: DecoratorKind::Interpolating,
                    rescale: &[],
                }
            }
        }
        TableKind::Effect100 => {
            if let Some(rules) = rescale_100(id) {
                no_op(rules)
            } else if NO_OP_100.contains(&id) {
                no_op(&[])
            } else if id == EffectId::BahamutZeroLoop {
                Classification {
                    decorator: DecoratorKind::Throttled,
                    rescale: &[],
                }
            } else {
                Classification {
                    decorator: DecoratorKind::Interpolating,
                    rescale: &[],
                }
            }
        }
    }
}
