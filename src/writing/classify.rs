//! Operation classification for reconstructed edits

use crate::error::EditError;
use crate::writing::types::{Classification, DiffRange, Operation};

/// Labels a diff range as an insertion, deletion or no-op
pub struct OperationClassifier;

impl OperationClassifier {
    /// Classify a range.
    ///
    /// Insertions add exactly one character, deletions add none; anything
    /// else is unsupported. A fully degenerate range is reported as `Same`
    /// with a selection.
    pub fn classify(range: &DiffRange) -> Result<Classification, EditError> {
        let DiffRange { s1, e1, s2, e2 } = *range;

        if s1 == e1 && e1 == s2 && s2 == e2 {
            return Ok(Classification {
                operation: Operation::Same,
                has_selection: true,
            });
        }

        if s2 + 1 == e2 {
            Ok(Classification {
                operation: Operation::Insert,
                has_selection: s1 != e1,
            })
        } else if s2 == e2 {
            Ok(Classification {
                operation: Operation::Delete,
                has_selection: s1 + 1 != e1,
            })
        } else {
            Err(EditError::Unsupported(*range))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(s1: usize, e1: usize, s2: usize, e2: usize) -> (Operation, bool) {
        let c = OperationClassifier::classify(&DiffRange::new(s1, e1, s2, e2)).unwrap();
        (c.operation, c.has_selection)
    }

    #[test]
    fn test_plain_insert_and_delete() {
        assert_eq!(classify(4, 4, 4, 5), (Operation::Insert, false));
        assert_eq!(classify(0, 0, 0, 1), (Operation::Insert, false));
        assert_eq!(classify(3, 4, 3, 3), (Operation::Delete, false));
        assert_eq!(classify(0, 1, 0, 0), (Operation::Delete, false));
    }

    #[test]
    fn test_selection_edits() {
        assert_eq!(classify(2, 4, 2, 3), (Operation::Insert, true));
        assert_eq!(classify(2, 4, 2, 2), (Operation::Delete, true));
        assert_eq!(classify(1, 3, 1, 2), (Operation::Insert, true));
    }

    #[test]
    fn test_degenerate_range_is_same_with_selection() {
        assert_eq!(classify(3, 3, 3, 3), (Operation::Same, true));
    }

    #[test]
    fn test_multi_character_insert_is_unsupported() {
        let range = DiffRange::new(0, 0, 0, 5);
        assert_eq!(
            OperationClassifier::classify(&range),
            Err(EditError::Unsupported(range))
        );

        let range = DiffRange::new(0, 4, 0, 4);
        assert!(OperationClassifier::classify(&range).is_err());
    }
}
