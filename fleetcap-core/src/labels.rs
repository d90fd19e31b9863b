//! Positional inspection labels
//!
//! Inspection photos carry no view metadata. The label shown for a photo is
//! derived purely from its position in capture order, both while capturing
//! and when listing stored files later.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Vehicle view inferred from a photo's position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InspectionView {
    /// First photo
    Front,
    /// Second photo
    DriverSide,
    /// Third photo
    Rear,
    /// Fourth photo
    PassengerSide,
    /// Fifth photo
    Interior,
    /// Sixth photo onwards, carrying the 1-based position
    Other(usize),
}

impl InspectionView {
    /// Label for a zero-based position
    pub fn from_position(index: usize) -> Self {
        match index {
            0 => InspectionView::Front,
            1 => InspectionView::DriverSide,
            2 => InspectionView::Rear,
            3 => InspectionView::PassengerSide,
            4 => InspectionView::Interior,
            n => InspectionView::Other(n + 1),
        }
    }

    /// Labels for a sequence of `count` photos
    pub fn sequence(count: usize) -> Vec<InspectionView> {
        (0..count).map(Self::from_position).collect()
    }
}

impl fmt::Display for InspectionView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InspectionView::Front => write!(f, "Front"),
            InspectionView::DriverSide => write!(f, "Driver Side"),
            InspectionView::Rear => write!(f, "Rear"),
            InspectionView::PassengerSide => write!(f, "Passenger Side"),
            InspectionView::Interior => write!(f, "Interior"),
            InspectionView::Other(n) => write!(f, "View {}", n),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_labels() {
        let labels: Vec<String> = InspectionView::sequence(7)
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(
            labels,
            vec![
                "Front",
                "Driver Side",
                "Rear",
                "Passenger Side",
                "Interior",
                "View 6",
                "View 7"
            ]
        );
    }

    #[test]
    fn test_other_carries_position() {
        assert_eq!(InspectionView::from_position(5), InspectionView::Other(6));
        assert_eq!(InspectionView::from_position(0), InspectionView::Front);
    }
}
