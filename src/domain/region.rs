// Region domain model and its derived display state
use crate::domain::error::AnnotationError;
use crate::domain::geo::{centroid, validate_polygon, LatLng};
use crate::domain::rules::ColorRule;
use crate::domain::selection::TimeSelection;
use crate::domain::series::SeriesPoint;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DATA_SOURCE: &str = "open-meteo";
pub const DEFAULT_VARIABLE: &str = "temperature_2m";

/// Fields written only by reconciliation
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedState {
    pub value: Option<f64>,
    pub color: Option<String>,
    pub series: Option<Vec<SeriesPoint>>,
    pub selection: Option<TimeSelection>,
}

impl DerivedState {
    /// True when any field of `candidate` differs from `self`
    pub fn differs_from(&self, candidate: &DerivedState) -> bool {
        self.value != candidate.value
            || self.color != candidate.color
            || self.selection != candidate.selection
            || !series_equal(self.series.as_deref(), candidate.series.as_deref())
    }
}

fn series_equal(a: Option<&[SeriesPoint]>, b: Option<&[SeriesPoint]>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => {
            a.len() == b.len()
                && a
                    .iter()
                    .zip(b)
                    .all(|(x, y)| x.time == y.time && x.value == y.value)
        }
        _ => false,
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub id: String,
    pub coordinates: Vec<LatLng>,
    pub centroid: LatLng,
    pub data_source: String,
    pub variable: String,
    /// Per-region overrides; not consulted yet, evaluation uses the global rule set
    pub rules: Vec<ColorRule>,
    pub time_selection: TimeSelection,
    #[serde(flatten)]
    pub derived: DerivedState,
}

/// Payload of a draw-complete event
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRegion {
    pub coordinates: Vec<LatLng>,
    #[serde(default)]
    pub data_source: Option<String>,
    #[serde(default)]
    pub variable: Option<String>,
}

impl Region {
    pub fn create(
        id: String,
        input: NewRegion,
        selection: TimeSelection,
    ) -> Result<Self, AnnotationError> {
        validate_polygon(&input.coordinates)?;
        let centroid = centroid(&input.coordinates)
            .ok_or_else(|| AnnotationError::InvalidGeometry("empty polygon".to_string()))?;

        Ok(Self {
            id,
            coordinates: input.coordinates,
            centroid,
            data_source: input
                .data_source
                .unwrap_or_else(|| DEFAULT_DATA_SOURCE.to_string()),
            variable: input.variable.unwrap_or_else(|| DEFAULT_VARIABLE.to_string()),
            rules: Vec::new(),
            time_selection: selection,
            derived: DerivedState::default(),
        })
    }
}

/// A region whose derived state must change
#[derive(Debug, Clone, PartialEq)]
pub struct RegionUpdate {
    pub id: String,
    pub derived: DerivedState,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(value: f64, color: &str, points: &[(&str, f64)]) -> DerivedState {
        DerivedState {
            value: Some(value),
            color: Some(color.to_string()),
            series: Some(points.iter().map(|(t, v)| SeriesPoint::new(*t, *v)).collect()),
            selection: Some(TimeSelection::Instant("2024-01-01T06:00".into())),
        }
    }

    #[test]
    fn test_identical_state_is_not_a_change() {
        let a = state(12.0, "B", &[("t0", 1.0), ("t1", 2.0)]);
        assert!(!a.differs_from(&a.clone()));
    }

    #[test]
    fn test_each_field_is_compared() {
        let base = state(12.0, "B", &[("t0", 1.0), ("t1", 2.0)]);

        assert!(base.differs_from(&state(12.5, "B", &[("t0", 1.0), ("t1", 2.0)])));
        assert!(base.differs_from(&state(12.0, "C", &[("t0", 1.0), ("t1", 2.0)])));
        assert!(base.differs_from(&state(12.0, "B", &[("t0", 1.0)])));
        assert!(base.differs_from(&state(12.0, "B", &[("t0", 1.0), ("t1", 2.5)])));
        assert!(base.differs_from(&state(12.0, "B", &[("t0", 1.0), ("tX", 2.0)])));

        let mut moved = base.clone();
        moved.selection = Some(TimeSelection::Instant("2024-01-01T07:00".into()));
        assert!(base.differs_from(&moved));

        assert!(DerivedState::default().differs_from(&base));
    }

    #[test]
    fn test_create_computes_centroid() {
        let input = NewRegion {
            coordinates: vec![
                LatLng::new(0.0, 0.0),
                LatLng::new(0.0, 3.0),
                LatLng::new(3.0, 0.0),
            ],
            data_source: None,
            variable: None,
        };
        let region = Region::create("r1".into(), input, TimeSelection::Instant("x".into())).unwrap();
        assert_eq!(region.centroid, LatLng::new(1.0, 1.0));
        assert_eq!(region.data_source, DEFAULT_DATA_SOURCE);
        assert_eq!(region.derived, DerivedState::default());
    }

    #[test]
    fn test_create_rejects_degenerate_polygon() {
        let input = NewRegion {
            coordinates: vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)],
            data_source: None,
            variable: None,
        };
        let err = Region::create("r1".into(), input, TimeSelection::Instant("x".into())).unwrap_err();
        assert!(matches!(err, AnnotationError::InvalidGeometry(_)));
    }
}
