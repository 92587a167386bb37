//! Scanned `<img>` element value object.

use std::fmt;

use crate::domain::errors::InlineError;

/// Prefix of an inline source value.
pub const DATA_URL_PREFIX: &str = "data:";

/// Attribute names kept on a scanned image. Everything else is dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeName {
    /// `src`
    Src,
    /// `alt`
    Alt,
    /// `style`
    Style,
    /// `longdesc`
    LongDesc,
    /// `width`
    Width,
    /// `height`
    Height,
}

impl AttributeName {
    /// Every supported attribute.
    pub const ALL: [Self; 6] = [
        Self::Src,
        Self::Alt,
        Self::Style,
        Self::LongDesc,
        Self::Width,
        Self::Height,
    ];

    /// Returns the markup name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Src => "src",
            Self::Alt => "alt",
            Self::Style => "style",
            Self::LongDesc => "longdesc",
            Self::Width => "width",
            Self::Height => "height",
        }
    }

    /// Looks up a supported attribute by its markup name (ASCII case-insensitive).
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|candidate| candidate.as_str().eq_ignore_ascii_case(name))
    }
}

impl fmt::Display for AttributeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single kept attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttribute {
    name: AttributeName,
    value: String,
}

impl ImageAttribute {
    /// Returns the attribute name.
    #[must_use]
    pub const fn name(&self) -> AttributeName {
        self.name
    }

    /// Returns the raw attribute value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An `<img>` element reduced to its supported attributes.
///
/// Attribute order is the source order. Exactly one `src` attribute is
/// present and only its value can change after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageTag {
    attributes: Vec<ImageAttribute>,
    src_index: usize,
}

impl ImageTag {
    /// Builds a tag from raw `(name, value)` pairs in source order.
    ///
    /// Unsupported attributes are dropped; a repeated name keeps its first value.
    ///
    /// # Errors
    /// Returns [`InlineError::MissingSource`] when no `src` attribute is present.
    pub fn from_attributes<I, K, V>(raw: I) -> Result<Self, InlineError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut attributes: Vec<ImageAttribute> = Vec::new();
        let mut src_index = None;

        for (key, value) in raw {
            let Some(name) = AttributeName::parse(key.as_ref()) else {
                continue;
            };
            if attributes.iter().any(|attr| attr.name == name) {
                continue;
            }
            if name == AttributeName::Src {
                src_index = Some(attributes.len());
            }
            attributes.push(ImageAttribute {
                name,
                value: value.into(),
            });
        }

        let src_index = src_index.ok_or(InlineError::MissingSource)?;
        Ok(Self {
            attributes,
            src_index,
        })
    }

    /// Builds a tag carrying only a `src` attribute.
    #[must_use]
    pub fn with_src(src: impl Into<String>) -> Self {
        Self {
            attributes: vec![ImageAttribute {
                name: AttributeName::Src,
                value: src.into(),
            }],
            src_index: 0,
        }
    }

    /// Returns the `src` value.
    #[must_use]
    pub fn src(&self) -> &str {
        &self.attributes[self.src_index].value
    }

    /// Replaces the `src` value in place.
    pub fn set_src(&mut self, src: impl Into<String>) {
        self.attributes[self.src_index].value = src.into();
    }

    /// Returns a copy of this tag with `src` replaced.
    #[must_use]
    pub fn replace_src(&self, src: impl Into<String>) -> Self {
        let mut copy = self.clone();
        copy.set_src(src);
        copy
    }

    /// Returns whether the source is already an inline data URL.
    #[must_use]
    pub fn is_inline(&self) -> bool {
        self.src().starts_with(DATA_URL_PREFIX)
    }

    /// Returns the value of a kept attribute.
    #[must_use]
    pub fn get(&self, name: AttributeName) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(ImageAttribute::value)
    }

    /// Returns kept attributes in source order.
    #[must_use]
    pub fn attributes(&self) -> &[ImageAttribute] {
        &self.attributes
    }

    /// Returns the position of `src` among the kept attributes.
    #[must_use]
    pub const fn src_index(&self) -> usize {
        self.src_index
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_supported_attributes_in_order() {
        let tag = ImageTag::from_attributes([
            ("alt", "aaaa"),
            ("class", "hero"),
            ("src", "image.gif"),
            ("width", "10"),
        ])
        .unwrap();

        let names: Vec<_> = tag.attributes().iter().map(ImageAttribute::name).collect();
        assert_eq!(
            names,
            vec![AttributeName::Alt, AttributeName::Src, AttributeName::Width]
        );
        assert_eq!(tag.src_index(), 1);
        assert_eq!(tag.src(), "image.gif");
        assert_eq!(tag.get(AttributeName::Alt), Some("aaaa"));
    }

    #[test]
    fn test_missing_src_is_rejected() {
        let result = ImageTag::from_attributes([("alt", "aaaa")]);

        assert!(matches!(result, Err(InlineError::MissingSource)));
    }

    #[test]
    fn test_first_duplicate_wins() {
        let tag =
            ImageTag::from_attributes([("src", "first.png"), ("SRC", "second.png")]).unwrap();

        assert_eq!(tag.attributes().len(), 1);
        assert_eq!(tag.src(), "first.png");
    }

    #[test]
    fn test_set_src_only_touches_src() {
        let mut tag = ImageTag::from_attributes([("alt", "a"), ("src", "x.png")]).unwrap();

        tag.set_src("bbb");

        assert_eq!(tag.src(), "bbb");
        assert_eq!(tag.get(AttributeName::Alt), Some("a"));
        assert_eq!(tag.src_index(), 1);
    }

    #[test]
    fn test_replace_src_leaves_original_untouched() {
        let original = ImageTag::with_src("x.png");

        let copy = original.replace_src("data:image/png;base64,AAAA");

        assert_eq!(original.src(), "x.png");
        assert!(copy.is_inline());
        assert!(!original.is_inline());
    }

    #[test]
    fn test_attribute_name_parse_is_case_insensitive() {
        assert_eq!(AttributeName::parse("LongDesc"), Some(AttributeName::LongDesc));
        assert_eq!(AttributeName::parse("srcset"), None);
    }
}
