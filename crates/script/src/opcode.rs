//! Opcode metadata for the battle animation script format.

use serde::{Deserialize, Serialize};

/// How far the cursor moves past an opcode handled generically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperandCount {
    /// Skip this many operand bytes.
    Fixed(u8),
    /// Step back this many bytes, re-reading the opcode next tick.
    Back(u8),
    /// Length depends on the operands. Never advanced generically.
    Variable,
}

use self::OperandCount::{Back, Fixed, Variable};

/// Operand layout of every opcode the script format uses, sorted by opcode.
///
/// Opcodes missing here (everything below `0x8E`, plus `0xBB`, `0xC0`,
/// `0xCD`, `0xD9` and `0xEF`) stop the tick when executed.
pub static OPERAND_COUNTS: [(u8, OperandCount); 109] = [
    (0x8E, Fixed(0)),
    (0x8F, Fixed(0)),
    (0x90, Fixed(3)),
    (0x91, Fixed(1)),
    (0x92, Fixed(0)),
    (0x93, Fixed(0)),
    (0x94, Fixed(5)),
    (0x95, Fixed(0)),
    (0x96, Fixed(2)),
    (0x97, Fixed(2)),
    (0x98, Fixed(1)),
    (0x99, Fixed(6)),
    (0x9A, Fixed(4)),
    (0x9B, Fixed(0)),
    (0x9C, Fixed(0)),
    (0x9D, Fixed(1)),
    (0x9E, Variable),
    (0x9F, Fixed(0)),
    (0xA0, Fixed(1)),
    (0xA1, Fixed(2)),
    (0xA2, Fixed(1)),
    (0xA3, Fixed(1)),
    (0xA4, Fixed(0)),
    (0xA5, Fixed(0)),
    (0xA6, Fixed(0)),
    (0xA7, Fixed(1)),
    (0xA8, Fixed(2)),
    (0xA9, Fixed(2)),
    (0xAA, Fixed(0)),
    (0xAB, Fixed(4)),
    (0xAC, Fixed(1)),
    (0xAD, Fixed(5)),
    (0xAE, Fixed(0)),
    (0xAF, Fixed(1)),
    (0xB0, Fixed(0)),
    (0xB1, Fixed(0)),
    (0xB2, Fixed(0)),
    (0xB3, Variable),
    (0xB4, Fixed(0)),
    (0xB5, Fixed(11)),
    (0xB6, Fixed(1)),
    (0xB7, Fixed(0)),
    (0xB8, Fixed(0)),
    (0xB9, Fixed(1)),
    (0xBA, Fixed(2)),
    (0xBC, Fixed(1)),
    (0xBD, Fixed(4)),
    (0xBE, Fixed(1)),
    (0xBF, Fixed(2)),
    (0xC1, Variable),
    (0xC2, Fixed(1)),
    (0xC3, Fixed(0)),
    (0xC4, Fixed(3)),
    (0xC5, Fixed(0)),
    (0xC6, Fixed(1)),
    (0xC7, Fixed(3)),
    (0xC8, Fixed(5)),
    (0xC9, Fixed(0)),
    (0xCA, Variable),
    (0xCB, Fixed(8)),
    (0xCC, Fixed(1)),
    (0xCE, Fixed(1)),
    (0xCF, Fixed(8)),
    (0xD0, Fixed(3)),
    (0xD1, Fixed(5)),
    (0xD2, Fixed(0)),
    (0xD3, Fixed(0)),
    (0xD4, Fixed(3)),
    (0xD5, Fixed(8)),
    (0xD6, Fixed(1)),
    (0xD7, Fixed(2)),
    (0xD8, Fixed(3)),
    (0xDA, Fixed(1)),
    (0xDB, Fixed(4)),
    (0xDC, Fixed(3)),
    (0xDD, Fixed(2)),
    (0xDE, Fixed(2)),
    (0xDF, Fixed(0)),
    (0xE0, Fixed(0)),
    (0xE1, Fixed(0)),
    (0xE2, Fixed(0)),
    (0xE3, Fixed(0)),
    (0xE4, Fixed(0)),
    (0xE5, Fixed(0)),
    (0xE6, Fixed(0)),
    (0xE7, Fixed(1)),
    (0xE8, Fixed(0)),
    (0xE9, Fixed(3)),
    (0xEA, Fixed(0)),
    (0xEB, Variable),
    (0xEC, Variable),
    (0xED, Fixed(0)),
    (0xEE, Variable),
    (0xF0, Fixed(0)),
    (0xF1, Back(1)),
    (0xF2, Fixed(0)),
    (0xF3, Variable),
    (0xF4, Variable),
    (0xF5, Fixed(1)),
    (0xF6, Fixed(0)),
    (0xF7, Fixed(1)),
    (0xF8, Fixed(1)),
    (0xF9, Fixed(0)),
    (0xFA, Fixed(0)),
    (0xFB, Fixed(4)),
    (0xFC, Fixed(0)),
    (0xFD, Fixed(6)),
    (0xFE, Variable),
    (0xFF, Variable),
];

/// Opcodes after which the tick ends.
pub const ENDING_OPCODES: [u8; 5] = [0xA2, 0xA7, 0xA9, 0xB6, 0xF1];

/// Operand layout of `opcode`, if the format defines it.
pub fn operand_count(opcode: u8) -> Option<OperandCount> {
    OPERAND_COUNTS
        .binary_search_by_key(&opcode, |&(op, _)| op)
        .ok()
        .map(|index| OPERAND_COUNTS[index].1)
}

/// Whether executing `opcode` ends the tick.
pub fn is_ending(opcode: u8) -> bool {
    ENDING_OPCODES.contains(&opcode)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted_and_unique() {
        assert!(OPERAND_COUNTS.windows(2).all(|w| w[0].0 < w[1].0));
    }

    #[test]
    fn known_operand_counts() {
        assert_eq!(operand_count(0x90), Some(Fixed(3)));
        assert_eq!(operand_count(0xB5), Some(Fixed(11)));
        assert_eq!(operand_count(0xF1), Some(Back(1)));
        assert_eq!(operand_count(0xC1), Some(Variable));
        assert_eq!(operand_count(0xFF), Some(Variable));
    }

    #[test]
    fn gaps_are_undefined() {
        for opcode in [0x00, 0x8D, 0xBB, 0xC0, 0xCD, 0xD9, 0xEF] {
            assert_eq!(operand_count(opcode), None, "opcode {opcode:#04x}");
        }
        assert_eq!(operand_count(0x8E), Some(Fixed(0)));
    }

    #[test]
    fn ending_opcodes_are_defined() {
        for opcode in ENDING_OPCODES {
            assert!(operand_count(opcode).is_some());
            assert!(is_ending(opcode));
        }
        assert!(!is_ending(0x90));
    }
}
