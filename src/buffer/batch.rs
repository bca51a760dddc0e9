use crate::domain::DataPoint;
use uuid::Uuid;

/// An immutable group of data points sent as one trap request.
#[derive(Debug, Clone)]
pub struct Batch {
    id: String,
    points: Vec<DataPoint>,
    packet_clock: Option<i64>,
}

impl Batch {
    pub fn new(points: Vec<DataPoint>, packet_clock: Option<i64>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            points,
            packet_clock,
        }
    }

    pub fn single(point: DataPoint) -> Self {
        Self::new(vec![point], None)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn size(&self) -> usize {
        self.points.len()
    }

    pub fn points(&self) -> &[DataPoint] {
        &self.points
    }

    pub fn packet_clock(&self) -> Option<i64> {
        self.packet_clock
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
