//! Purpose: Pull vehicle position records out of a GeoJSON-shaped tree.
//! Exports: `VehicleRecord`, `extract_vehicles`.
//! Role: Schema-aware reader layered over the generic `Node` tree.
//! Invariants: `features` children must be unlabelled (array elements).
//! Invariants: `geometry.coordinates` holds exactly two numeric leaves: longitude, latitude.
//! Invariants: Any schema violation aborts extraction; no partial results are returned.
use std::fmt;

use serde::Serialize;

use crate::core::error::Error;
use crate::core::tree::Node;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct VehicleRecord {
    pub name: String,
    pub id: i64,
    pub longitude: f64,
    pub latitude: f64,
}

impl fmt::Display for VehicleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Bus {} with ID {} is at coordinates: {}, {}",
            self.name, self.id, self.longitude, self.latitude
        )
    }
}

pub fn extract_vehicles(tree: &Node) -> Result<Vec<VehicleRecord>, Error> {
    let features = tree.get_child("features")?;
    let mut records = Vec::with_capacity(features.len());
    for (index, (label, feature)) in features.children().enumerate() {
        if !label.is_empty() {
            return Err(Error::schema(format!(
                "\"features\" child node has a name (\"{label}\")"
            )));
        }
        let record = vehicle_from_feature(feature)
            .map_err(|err| with_feature_index(err, index))?;
        records.push(record);
    }
    tracing::debug!(count = records.len(), "extracted vehicle records");
    Ok(records)
}

fn vehicle_from_feature(feature: &Node) -> Result<VehicleRecord, Error> {
    let name = feature.get::<String>("properties.route_name")?;
    let id = feature.get::<i64>("properties.vehicle_id")?;

    let coordinates = feature.get_child("geometry.coordinates")?;
    if coordinates.len() != 2 {
        return Err(Error::schema(format!(
            "coordinates node does not contain 2 items (found {})",
            coordinates.len()
        )));
    }
    let (Some(first), Some(last)) = (coordinates.first(), coordinates.last()) else {
        return Err(Error::schema("coordinates node does not contain 2 items"));
    };

    Ok(VehicleRecord {
        name,
        id,
        longitude: first.get_value()?,
        latitude: last.get_value()?,
    })
}

fn with_feature_index(err: Error, index: usize) -> Error {
    match err.message().map(|message| format!("feature {index}: {message}")) {
        Some(message) => Error::schema(message),
        None => err,
    }
}
