use crate::foundation::core::{MarkerDescriptor, MarkerId, PhysicalSize};
use crate::foundation::error::{MarkerlayError, MarkerlayResult};

/// One image the tracking source is able to recognize.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceImage {
    pub name: MarkerId,
    /// Printed width in metres.
    pub physical_width: f64,
    /// Printed height in metres.
    pub physical_height: f64,
}

/// The group of reference images a session is configured to track.
///
/// Loaded from `<assets>/<group>.json`. A session cannot do anything useful without it, so a
/// missing or malformed catalog is reported as [`MarkerlayError::MissingResource`].
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ReferenceCatalog {
    #[serde(default)]
    pub group: String,
    pub images: Vec<ReferenceImage>,
}

impl ReferenceCatalog {
    pub fn from_json_str(group: &str, json: &str) -> MarkerlayResult<Self> {
        let mut catalog: ReferenceCatalog = serde_json::from_str(json).map_err(|e| {
            MarkerlayError::missing_resource(format!(
                "reference catalog '{group}' is not valid json: {e}"
            ))
        })?;
        if catalog.group.is_empty() {
            catalog.group = group.to_string();
        }
        catalog.validate()?;
        Ok(catalog)
    }

    pub fn validate(&self) -> MarkerlayResult<()> {
        if self.images.is_empty() {
            return Err(MarkerlayError::missing_resource(format!(
                "reference catalog '{}' has no images",
                self.group
            )));
        }
        for (i, img) in self.images.iter().enumerate() {
            if img.name.as_str().is_empty() {
                return Err(MarkerlayError::validation(format!(
                    "reference image #{i} has an empty name"
                )));
            }
            if self.images[..i].iter().any(|other| other.name == img.name) {
                return Err(MarkerlayError::validation(format!(
                    "duplicate reference image '{}'",
                    img.name
                )));
            }
            PhysicalSize::new(img.physical_width, img.physical_height).map_err(|e| {
                MarkerlayError::validation(format!("reference image '{}': {e}", img.name))
            })?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Descriptor for an exact name match.
    pub fn descriptor(&self, name: &MarkerId) -> Option<MarkerDescriptor> {
        self.images
            .iter()
            .find(|img| &img.name == name)
            .map(|img| MarkerDescriptor {
                id: img.name.clone(),
                physical_size: PhysicalSize {
                    width: img.physical_width,
                    height: img.physical_height,
                },
            })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/catalog.rs"]
mod tests;
