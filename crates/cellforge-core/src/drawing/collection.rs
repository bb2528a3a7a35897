use super::{Anchor, Image};
use crate::cell::CellReference;
use crate::error::{Error, Result};

/// Ordered images of one worksheet
///
/// Names are unique within the collection: a clash gets a `_1`, `_2`, ...
/// suffix, and unnamed images are called `Image{n}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageCollection {
    images: Vec<Image>,
}

impl ImageCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an image, assigning it a unique name. Returns the final name.
    pub fn add(&mut self, mut image: Image) -> &str {
        let base = image
            .name
            .take()
            .unwrap_or_else(|| format!("Image{}", self.images.len() + 1));

        let mut name = base.clone();
        let mut counter = 1;
        while self.get(&name).is_some() {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }

        image.name = Some(name);
        self.images.push(image);
        let last = self.images.len() - 1;
        self.images[last].name.as_deref().unwrap_or_default()
    }

    /// Add an image with a default two-cell anchor at `cell`
    pub fn add_at(&mut self, image: Image, cell: &str) -> Result<&str> {
        let anchor = Anchor::at_cell(cell)?;
        Ok(self.add(image.with_anchor(anchor)))
    }

    /// Look up an image by name
    pub fn get(&self, name: &str) -> Option<&Image> {
        self.images.iter().find(|i| i.name.as_deref() == Some(name))
    }

    /// Mutable lookup by name
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Image> {
        self.images
            .iter_mut()
            .find(|i| i.name.as_deref() == Some(name))
    }

    /// Remove an image by name
    pub fn remove(&mut self, name: &str) -> Result<Image> {
        let idx = self
            .images
            .iter()
            .position(|i| i.name.as_deref() == Some(name))
            .ok_or_else(|| Error::other(format!("Image not found: {}", name)))?;
        Ok(self.images.remove(idx))
    }

    /// Images whose anchor starts at or spans over `cell`
    pub fn at_position(&self, cell: &CellReference) -> Vec<&Image> {
        self.images
            .iter()
            .filter(|i| i.anchor.covers(cell))
            .collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.images.iter().filter_map(|i| i.name.as_deref()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Image> {
        self.images.iter()
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn clear(&mut self) {
        self.images.clear();
    }
}

impl<'a> IntoIterator for &'a ImageCollection {
    type Item = &'a Image;
    type IntoIter = std::slice::Iter<'a, Image>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::image::tests::png_bytes;

    #[test]
    fn test_unique_names() {
        let mut images = ImageCollection::new();
        assert_eq!(images.add(Image::from_bytes(png_bytes(1, 1))), "Image1");
        assert_eq!(
            images.add(Image::from_bytes(png_bytes(1, 1)).with_name("Image1")),
            "Image1_1"
        );
        assert_eq!(
            images.add(Image::from_bytes(png_bytes(1, 1)).with_name("Image1")),
            "Image1_2"
        );
        assert_eq!(images.names(), vec!["Image1", "Image1_1", "Image1_2"]);
    }

    #[test]
    fn test_add_at_and_lookup() {
        let mut images = ImageCollection::new();
        images
            .add_at(Image::from_bytes(png_bytes(4, 4)), "C3")
            .unwrap();
        assert_eq!(images.at_position(&CellReference::new(3, 3)).len(), 1);
        assert!(images.remove("Image1").is_ok());
        assert!(images.is_empty());
        assert!(images.remove("Image1").is_err());
    }
}
