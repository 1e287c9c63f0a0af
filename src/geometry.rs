//! Region boundary tables loaded from GeoJSON.
//!
//! A table is keyed by the normalized (and alias-resolved) value of one
//! feature property, e.g. `sigla` for states or `name` for municipalities.
//! Unlike the record stores, a geometry failure only disables the map charts.

use std::fs;
use std::path::Path;

use geo::BoundingRect;
use geojson::{feature::Id, Feature, FeatureCollection, GeoJson, Geometry, JsonObject};

use crate::normalize::RegionAliases;

// ---

#[derive(Debug, thiserror::Error)]
pub enum GeometryError {
    #[error("cannot read geometry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid GeoJSON: {0}")]
    Parse(#[from] geojson::Error),

    #[error("expected a FeatureCollection")]
    NotFeatureCollection,
}

/// One region boundary plus its join key.
#[derive(Debug, Clone)]
pub struct GeometryRecord {
    /// Normalized, alias-resolved identifier used for joining.
    pub id: String,
    /// Property value as it appears in the source file.
    pub name: String,
    pub geometry: Geometry,
    /// `[min_x, min_y, max_x, max_y]`, when the geometry is non-empty.
    pub bbox: Option<[f64; 4]>,
}

/// Immutable list of region boundaries in source order.
#[derive(Debug, Clone, Default)]
pub struct GeometryTable {
    key_property: String,
    records: Vec<GeometryRecord>,
}

impl GeometryTable {
    // ---
    pub fn load(
        path: &Path,
        key_property: &str,
        aliases: &RegionAliases,
    ) -> Result<Self, GeometryError> {
        // ---
        let raw = fs::read_to_string(path)?;
        let table = Self::from_geojson_str(&raw, key_property, aliases)?;
        tracing::info!(
            "Loaded {} geometries from {} (key: {})",
            table.len(),
            path.display(),
            key_property
        );
        Ok(table)
    }

    pub fn from_geojson_str(
        raw: &str,
        key_property: &str,
        aliases: &RegionAliases,
    ) -> Result<Self, GeometryError> {
        // ---
        let GeoJson::FeatureCollection(collection) = raw.parse::<GeoJson>()? else {
            return Err(GeometryError::NotFeatureCollection);
        };

        let mut records = Vec::with_capacity(collection.features.len());
        for (i, feature) in collection.features.into_iter().enumerate() {
            let Some(name) = feature.property(key_property).and_then(property_to_string) else {
                tracing::warn!("Feature {} has no '{}' property, skipping", i, key_property);
                continue;
            };
            let Some(geometry) = feature.geometry else {
                tracing::warn!("Feature {} ('{}') has no geometry, skipping", i, name);
                continue;
            };

            records.push(GeometryRecord {
                id: aliases.resolve(&name),
                bbox: bounding_box(&geometry),
                name,
                geometry,
            });
        }

        Ok(Self {
            key_property: key_property.to_string(),
            records,
        })
    }

    pub fn records(&self) -> &[GeometryRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Union of every geometry's bounding box.
    pub fn bounds(&self) -> Option<[f64; 4]> {
        // ---
        self.records
            .iter()
            .filter_map(|r| r.bbox)
            .reduce(|a, b| [a[0].min(b[0]), a[1].min(b[1]), a[2].max(b[2]), a[3].max(b[3])])
    }

    /// `[lon, lat]` centre of [`bounds`](Self::bounds), for the map viewport.
    pub fn center(&self) -> Option<[f64; 2]> {
        self.bounds()
            .map(|[min_x, min_y, max_x, max_y]| [(min_x + max_x) / 2.0, (min_y + max_y) / 2.0])
    }

    /// Re-emit the layer with each feature's `id` set to its join key.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        // ---
        let features = self
            .records
            .iter()
            .map(|record| {
                let mut properties = JsonObject::new();
                properties.insert(
                    self.key_property.clone(),
                    serde_json::Value::String(record.name.clone()),
                );
                Feature {
                    bbox: record.bbox.map(|b| b.to_vec()),
                    geometry: Some(record.geometry.clone()),
                    id: Some(Id::String(record.id.clone())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            })
            .collect();

        FeatureCollection {
            bbox: self.bounds().map(|b| b.to_vec()),
            features,
            foreign_members: None,
        }
    }
}

fn property_to_string(value: &serde_json::Value) -> Option<String> {
    // ---
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn bounding_box(geometry: &Geometry) -> Option<[f64; 4]> {
    // ---
    let shape = geo::Geometry::<f64>::try_from(geometry.clone()).ok()?;
    let rect = shape.bounding_rect()?;
    Some([rect.min().x, rect.min().y, rect.max().x, rect.max().y])
}
