//! Geometry layouts: the named attribute set shared between geometries.
//!
//! A [`GeometryLayout`] is the structural half of a geometry. Geometries
//! created from a prototype share the prototype's layout through an `Arc` and
//! only carry their own buffer list, so thousands of sprites built from one
//! prototype cost one layout.
//!
//! # Example
//!
//! ```
//! use vellum_core::geometry::{Attribute, GeometryLayout, VertexFormat};
//!
//! let mut layout = GeometryLayout::new();
//! layout.add("aPosition", Attribute::new(VertexFormat::Float32x2));
//! layout.add("aColor", Attribute::new(VertexFormat::Float32x3));
//! layout.check_attributes();
//!
//! let color = layout.get("aColor").unwrap();
//! assert_eq!(color.offset(), 8);
//! assert_eq!(color.stride(), 20);
//! ```

use std::collections::BTreeSet;

use super::attribute::Attribute;

/// Ordered map from attribute name to [`Attribute`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct GeometryLayout {
    attributes: Vec<(String, Attribute)>,
    dirty: bool,
}

impl GeometryLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a named attribute.
    ///
    /// Replacing keeps the attribute's declaration position.
    pub fn add(&mut self, name: impl Into<String>, attribute: Attribute) {
        let name = name.into();
        match self.attributes.iter_mut().find(|(n, _)| *n == name) {
            Some((_, existing)) => *existing = attribute,
            None => self.attributes.push((name, attribute)),
        }
        self.dirty = true;
    }

    /// Check if the layout declares `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.attributes.iter().any(|(n, _)| n == name)
    }

    /// Get an attribute by name.
    pub fn get(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, attr)| attr)
    }

    /// Iterate attributes in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.attributes.iter().map(|(n, a)| (n.as_str(), a))
    }

    /// Iterate per-instance attributes in declaration order.
    pub fn instance_attributes(&self) -> impl Iterator<Item = (&str, &Attribute)> {
        self.iter().filter(|(_, attr)| attr.instance)
    }

    /// Get all attributes reading from a specific buffer slot.
    pub fn attributes_for_buffer(&self, buffer_index: usize) -> impl Iterator<Item = &Attribute> {
        self.attributes
            .iter()
            .map(|(_, attr)| attr)
            .filter(move |attr| attr.buffer_index == buffer_index)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the layout has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Highest buffer slot referenced plus one.
    pub fn buffer_slots(&self) -> usize {
        self.attributes
            .iter()
            .map(|(_, attr)| attr.buffer_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// Whether a structural change is waiting for [`check_attributes`](Self::check_attributes).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Resolve packed strides and offsets.
    ///
    /// For each buffer slot, attributes without an explicit stride get the sum
    /// of the format sizes of those attributes; attributes without an explicit
    /// offset get the cumulative size of the attributes declared before them on
    /// the same slot. Returns `false` without touching anything when nothing
    /// changed since the last call.
    pub fn check_attributes(&mut self) -> bool {
        if !self.dirty {
            return false;
        }

        let slots: BTreeSet<usize> = self
            .attributes
            .iter()
            .map(|(_, attr)| attr.buffer_index)
            .collect();

        for slot in slots {
            let packed_stride: u32 = self
                .attributes_for_buffer(slot)
                .filter(|attr| attr.stride.is_none())
                .map(|attr| attr.format.size())
                .sum();

            let mut running = 0;
            for (_, attr) in self
                .attributes
                .iter_mut()
                .filter(|(_, attr)| attr.buffer_index == slot)
            {
                attr.resolve(packed_stride, running);
                running += attr.format.size();
            }
        }

        self.dirty = false;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::VertexFormat;

    fn sprite_layout() -> GeometryLayout {
        let mut layout = GeometryLayout::new();
        layout.add("aPosition", Attribute::new(VertexFormat::Float32x2));
        layout.add("aUV", Attribute::new(VertexFormat::Float32x2));
        layout.add("aColor", Attribute::new(VertexFormat::Unorm8x4));
        layout.add(
            "aInstance",
            Attribute::new(VertexFormat::Sint32x2).at_buffer(1).per_instance(),
        );
        layout
    }

    #[test]
    fn test_packing_per_buffer() {
        let mut layout = sprite_layout();
        assert!(layout.check_attributes());

        let offsets: Vec<u32> = layout.attributes_for_buffer(0).map(|a| a.offset()).collect();
        assert_eq!(offsets, vec![0, 8, 16]);
        assert!(layout.attributes_for_buffer(0).all(|a| a.stride() == 20));

        let instance = layout.get("aInstance").unwrap();
        assert_eq!(instance.offset(), 0);
        assert_eq!(instance.stride(), 8);
        assert_eq!(layout.buffer_slots(), 2);
    }

    #[test]
    fn test_check_attributes_is_idempotent() {
        let mut layout = sprite_layout();
        assert!(layout.check_attributes());
        let snapshot = layout.clone();
        assert!(!layout.check_attributes());
        assert_eq!(layout, snapshot);
    }

    #[test]
    fn test_explicit_values_survive_packing() {
        let mut layout = GeometryLayout::new();
        layout.add("aPosition", Attribute::new(VertexFormat::Float32x2));
        layout.add(
            "aExtra",
            Attribute::new(VertexFormat::Float32).with_stride(64).with_offset(40),
        );
        layout.check_attributes();

        assert_eq!(layout.get("aPosition").unwrap().stride(), 8);
        let extra = layout.get("aExtra").unwrap();
        assert_eq!(extra.stride(), 64);
        assert_eq!(extra.offset(), 40);
    }

    #[test]
    fn test_replacing_attribute_keeps_position_and_dirties() {
        let mut layout = sprite_layout();
        layout.check_attributes();
        layout.add("aUV", Attribute::new(VertexFormat::Unorm16x2));
        assert!(layout.is_dirty());
        layout.check_attributes();

        let names: Vec<&str> = layout.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["aPosition", "aUV", "aColor", "aInstance"]);
        assert_eq!(layout.get("aColor").unwrap().offset(), 12);
    }
}
