//! Install plan for the engine patches that accompany a frame multiplier.
//!
//! Applying patches to engine code is the job of an external patcher. This
//! module only describes which constants must change and how, so the plan can
//! be reviewed and tested independently of any process.

use serde::Serialize;

use crate::limiter::FpsLimiter;
use crate::multiplier::FrameMultiplier;

/// Storage width of a patched constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchWidth {
    /// 8-bit immediate.
    Byte,
    /// 16-bit immediate.
    Word,
    /// 32-bit immediate.
    Dword,
    /// Signed 32-bit immediate.
    Int,
    /// 32-bit float constant.
    Float,
}

/// What to do at a patch site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchOp {
    /// Multiply the constant by the multiplier.
    Multiply {
        /// Width of the constant.
        width: PatchWidth,
        /// Factor to apply.
        factor: u8,
    },
    /// Divide the constant by the multiplier.
    Divide {
        /// Width of the constant.
        width: PatchWidth,
        /// Divisor to apply.
        divisor: u8,
    },
    /// Overwrite a single byte.
    SetByte(u8),
    /// Overwrite a 32-bit value.
    SetDword(u32),
    /// Fill with `len` no-op instructions.
    Nop {
        /// Number of bytes to overwrite.
        len: u8,
    },
    /// Point the damage bounce lookup at the table for the active rate.
    BounceTable {
        /// Number of entries in the replacement table.
        len: u8,
    },
}

/// One entry of the install plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PatchDirective {
    /// Symbolic name of the engine routine that hosts the constant.
    pub site: &'static str,
    /// Byte offset from the routine entry.
    pub offset: u32,
    /// Operation to perform.
    pub op: PatchOp,
}

struct Plan {
    m: u8,
    out: Vec<PatchDirective>,
}

impl Plan {
    fn push(&mut self, site: &'static str, offset: u32, op: PatchOp) {
        self.out.push(PatchDirective { site, offset, op });
    }

    fn mul(&mut self, site: &'static str, offset: u32, width: PatchWidth) {
        let factor = self.m;
        self.push(site, offset, PatchOp::Multiply { width, factor });
    }

    fn div(&mut self, site: &'static str, offset: u32, width: PatchWidth) {
        let divisor = self.m;
        self.push(site, offset, PatchOp::Divide { width, divisor });
    }
}

/// Build the patch plan for a multiplier.
///
/// Multiply/divide directives are emitted even for the original rate, where
/// they are identities, so the plan shape does not depend on the rate.
pub fn install_plan(multiplier: FrameMultiplier, limiter: FpsLimiter) -> Vec<PatchDirective> {
    use PatchWidth::{Byte, Dword, Float, Int, Word};

    let mut plan = Plan {
        m: multiplier.get(),
        out: Vec::with_capacity(96),
    };

    if limiter == FpsLimiter::Fps30 {
        plan.mul("battle_update_3d_model_data", 0x13E, Byte);
        plan.mul("battle_update_3d_model_data", 0x316, Byte);
    }

    // Enemy death sequences
    plan.mul("battle_enemy_death", 0x40, Word);
    plan.div("battle_enemy_death_step", 0xA8, Word);
    plan.div("battle_enemy_death_step", 0xCB, Byte);

    plan.mul("battle_iainuki_death", 0x40, Word);
    for (offset, width) in [
        (0x9F, Word),
        (0xC2, Byte),
        (0xE3, Byte),
        (0x104, Byte),
        (0x154, Word),
    ] {
        plan.div("battle_iainuki_death_step", offset, width);
    }

    plan.mul("battle_boss_death", 0x40, Word);
    plan.mul("battle_boss_death", 0xCF, Word);
    plan.div("battle_boss_death_step", 0xCF, Byte);
    plan.div("battle_boss_death_step", 0xF1, Byte);

    plan.mul("battle_melting_death", 0x40, Word);
    for (offset, width) in [
        (0xAB, Word),
        (0xCE, Byte),
        (0xEE, Word),
        (0x10D, Word),
        (0x12C, Word),
    ] {
        plan.div("battle_melting_death_step", offset, width);
    }

    plan.mul("battle_disintegrate_2_death", 0x40, Word);
    plan.div("battle_disintegrate_2_death_step", 0xB9, Word);
    plan.div("battle_disintegrate_2_death_step", 0xDB, Byte);
    plan.div("battle_disintegrate_2_fade_constant", 0, Float);

    plan.mul("battle_morph_death", 0x40, Word);
    for (offset, width) in [
        (0x9F, Word),
        (0xC2, Byte),
        (0xE3, Byte),
        (0x104, Byte),
        (0x154, Word),
    ] {
        plan.div("battle_morph_death_step", offset, width);
    }

    plan.mul("battle_disintegrate_1_death", 0x40, Word);

    // Character fade in/out
    plan.mul("battle_character_fade", 0x11A, Byte);
    plan.mul("vincent_limit_fade_effect", 0x24, Word);
    plan.mul("vincent_limit_fade_effect", 0x57, Word);
    plan.mul("vincent_limit_fade_effect", 0x6E, Byte);
    plan.mul("battle_fade_5c18bc", 0xDC, Word);
    plan.mul("battle_fade_5c18bc", 0xE4, Byte);
    plan.mul("battle_fade_5c1c8f", 0x55, Word);
    plan.mul("battle_fade_5c1c8f", 0x5D, Byte);

    // Summons
    plan.mul("run_summon_animations", 0x75, Byte);
    plan.mul("run_summon_animations", 0x6D, Byte);
    plan.mul("run_summon_animations", 0x15B, Byte);
    plan.push("run_shiva_camera", 0xC2D, PatchOp::Nop { len: 6 });
    plan.push("run_ramuh_camera", 0x44, PatchOp::SetDword(0x000B_9585));
    plan.push("run_odin_gunge_camera", 0xC0C, PatchOp::Nop { len: 6 });
    plan.mul("run_summon_odin_steel", 0x5E, Dword);
    plan.mul("run_summon_odin_steel", 0x25D, Dword);
    plan.mul("run_summon_odin_steel", 0x265, Byte);

    // Damage display
    plan.mul("display_battle_damage", 0x54, Word);
    if let Some(table) = multiplier.damage_bounce_offsets() {
        let len = table.len() as u8;
        plan.push("display_battle_damage", 0x1E2, PatchOp::BounceTable { len });
        plan.push("display_battle_damage", 0x2D7, PatchOp::BounceTable { len });
    }

    // Aura animations
    plan.push("magic_aura_effects", 0x4C, PatchOp::SetByte(multiplier.aura_phase(0x7)));
    plan.push("magic_aura_effects", 0x6A, PatchOp::SetByte(multiplier.aura_phase(0xA)));
    plan.mul("magic_aura_effects", 0x88, Byte);
    plan.push("magic_aura_effects", 0xA2, PatchOp::SetByte(multiplier.aura_phase(0xC)));
    plan.mul("magic_aura_effects", 0x138, Byte);
    plan.div("limit_break_aura_effects", 0x4C, Dword);
    plan.mul("limit_break_aura_effects", 0x6E, Byte);
    plan.div("limit_break_aura_effects", 0x7A, Dword);
    plan.mul("limit_break_aura_effects", 0x98, Byte);
    plan.mul("limit_break_aura_effects", 0xAD, Byte);
    plan.push("limit_break_aura_effects", 0xB0, PatchOp::SetByte(multiplier.aura_phase(0x9)));
    plan.mul("limit_break_aura_effects", 0x13E, Byte);
    plan.mul("enemy_skill_aura_effects", 0x5C, Dword);
    plan.push("enemy_skill_aura_effects", 0x64, PatchOp::SetByte(multiplier.aura_phase(0x7)));
    plan.mul("enemy_skill_aura_effects", 0x81, Dword);
    plan.push("enemy_skill_aura_effects", 0x89, PatchOp::SetByte(multiplier.aura_phase(0xA)));
    plan.mul("enemy_skill_aura_effects", 0xA7, Byte);
    plan.div("enemy_skill_aura_effects", 0xB3, Int);
    plan.mul("enemy_skill_aura_effects", 0xD6, Byte);
    plan.push("enemy_skill_aura_effects", 0xD9, PatchOp::SetByte(multiplier.aura_phase(0xC)));
    plan.mul("enemy_skill_aura_effects", 0x182, Byte);
    plan.push("summon_aura_effects", 0x4D, PatchOp::SetByte(multiplier.aura_phase(0xC)));
    plan.mul("summon_aura_effects", 0x19D, Byte);

    // Limit breaks
    plan.mul("tifa_limit_2_1", 0x1FE, Byte);
    plan.push("aerith_limit_2_1", 0xCE, PatchOp::Nop { len: 6 });
    plan.mul("aerith_limit_2_1", 0xE2, Byte);

    // Effect60 routines
    plan.mul("battle_effect60_425e5f", 0x3A, Word);
    plan.mul("battle_effect60_5bcf9d", 0x3A, Word);
    plan.push("battle_effect60_5bd050", 0x1DC, PatchOp::SetByte(multiplier.aura_phase(0x2)));
    plan.push("battle_effect60_5bd050", 0x203, PatchOp::SetByte(multiplier.aura_phase(0x2)));
    plan.mul("battle_effect60_5bcd42", 0x5B, Word);
    plan.div("battle_effect60_5bcd42", 0x6E, Word);

    // Tifa slot reel speed
    plan.push("tifa_slots_reel", 0x168, PatchOp::SetByte(0x3));
    plan.push("tifa_slots_reel", 0x16B, PatchOp::SetByte(0xCA));

    plan.out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_animation_patches_only_at_30_fps() {
        let at_30 = install_plan(FrameMultiplier::X2, FpsLimiter::Fps30);
        let at_60 = install_plan(FrameMultiplier::X4, FpsLimiter::Fps60);
        let has_model_patch =
            |plan: &[PatchDirective]| plan.iter().any(|d| d.site == "battle_update_3d_model_data");
        assert!(has_model_patch(at_30.as_slice()));
        assert!(!has_model_patch(at_60.as_slice()));
        assert_eq!(at_30.len(), at_60.len() + 2);
    }

    #[test]
    fn bounce_table_follows_rate() {
        let original = install_plan(FrameMultiplier::ORIGINAL, FpsLimiter::Original);
        assert!(!original
            .iter()
            .any(|d| matches!(d.op, PatchOp::BounceTable { .. })));

        let at_60 = install_plan(FrameMultiplier::X4, FpsLimiter::Fps60);
        let tables: Vec<_> = at_60
            .iter()
            .filter_map(|d| match d.op {
                PatchOp::BounceTable { len } => Some(len),
                _ => None,
            })
            .collect();
        assert_eq!(tables, vec![44, 44]);
    }

    #[test]
    fn multiply_directives_carry_active_factor() {
        let plan = install_plan(FrameMultiplier::X4, FpsLimiter::Fps60);
        assert!(plan.iter().all(|d| match d.op {
            PatchOp::Multiply { factor, .. } => factor == 4,
            PatchOp::Divide { divisor, .. } => divisor == 4,
            _ => true,
        }));
        let aura = plan
            .iter()
            .find(|d| d.site == "magic_aura_effects" && d.offset == 0x4C)
            .map(|d| d.op);
        assert_eq!(aura, Some(PatchOp::SetByte(5)));
    }
}
