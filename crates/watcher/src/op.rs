//! Filesystem operation bitmask

use bitflags::bitflags;
use std::fmt;
use std::str::FromStr;

bitflags! {
    /// Set of filesystem operations.
    ///
    /// A watch accepts an event when the event's operations are a subset of
    /// the watch's mask, so `WRITE` passes a watch configured with
    /// `WRITE | CHMOD`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Op: u32 {
        const CREATE = 1 << 0;
        const WRITE = 1 << 1;
        const REMOVE = 1 << 2;
        const RENAME = 1 << 3;
        const CHMOD = 1 << 4;
    }
}

/// Every operation the router knows about
pub const ALL_OPS: Op = Op::all();

const NAMES: [(Op, &str); 5] = [
    (Op::CREATE, "CREATE"),
    (Op::WRITE, "WRITE"),
    (Op::REMOVE, "REMOVE"),
    (Op::RENAME, "RENAME"),
    (Op::CHMOD, "CHMOD"),
];

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (op, name) in NAMES {
            if self.contains(op) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Error returned when an operation name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operation '{0}' (expected create, write, remove, rename, chmod or all)")]
pub struct ParseOpError(pub String);

impl FromStr for Op {
    type Err = ParseOpError;

    /// Parse names separated by `|` or `,`, e.g. `create|write` or `all`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ops = Op::empty();
        for part in s.split(['|', ',']).map(str::trim).filter(|p| !p.is_empty()) {
            ops |= match part.to_ascii_lowercase().as_str() {
                "create" => Op::CREATE,
                "write" => Op::WRITE,
                "remove" => Op::REMOVE,
                "rename" => Op::RENAME,
                "chmod" => Op::CHMOD,
                "all" => ALL_OPS,
                _ => return Err(ParseOpError(part.to_string())),
            };
        }
        Ok(ops)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_ops_accepts_every_operation() {
        for (op, _) in NAMES {
            assert!(ALL_OPS.contains(op));
        }
    }

    #[test]
    fn test_single_bit_mask_accepts_only_itself() {
        for (mask, _) in NAMES {
            for (op, _) in NAMES {
                assert_eq!(mask.contains(op), mask == op, "{mask} vs {op}");
            }
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(Op::WRITE.to_string(), "WRITE");
        assert_eq!((Op::CREATE | Op::CHMOD).to_string(), "CREATE|CHMOD");
        assert_eq!(ALL_OPS.to_string(), "CREATE|WRITE|REMOVE|RENAME|CHMOD");
        assert_eq!(Op::empty().to_string(), "");
    }

    #[test]
    fn test_parse() {
        assert_eq!("write".parse::<Op>().unwrap(), Op::WRITE);
        assert_eq!("Create|chmod".parse::<Op>().unwrap(), Op::CREATE | Op::CHMOD);
        assert_eq!("create, rename".parse::<Op>().unwrap(), Op::CREATE | Op::RENAME);
        assert_eq!("all".parse::<Op>().unwrap(), ALL_OPS);
        assert!("truncate".parse::<Op>().is_err());
    }
}
