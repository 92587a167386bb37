//! HTML fragment rendering of inlined images.

use html_escape::encode_double_quoted_attribute;

use crate::domain::entities::ImageTag;

/// Renders one image as a self-closing `<img/>` element.
///
/// Attributes keep their scanned order and values are escaped for a
/// double-quoted context.
#[must_use]
pub fn render_image(image: &ImageTag) -> String {
    let mut markup = String::from("<img");
    for attribute in image.attributes() {
        markup.push(' ');
        markup.push_str(attribute.name().as_str());
        markup.push_str("=\"");
        markup.push_str(&encode_double_quoted_attribute(attribute.value()));
        markup.push('"');
    }
    markup.push_str("/>");
    markup
}

/// Renders all images, one element per line.
#[must_use]
pub fn render_fragment(images: &[ImageTag]) -> String {
    images
        .iter()
        .map(render_image)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_keeps_attribute_order() {
        let image = ImageTag::from_attributes([
            ("width", "10"),
            ("src", "data:image/png;base64,AA=="),
            ("alt", "logo"),
        ])
        .unwrap();

        assert_eq!(
            render_image(&image),
            r#"<img width="10" src="data:image/png;base64,AA==" alt="logo"/>"#
        );
    }

    #[test]
    fn test_render_escapes_values() {
        let image = ImageTag::from_attributes([
            ("src", "data:,x"),
            ("alt", r#"say "hi" & bye"#),
        ])
        .unwrap();

        let markup = render_image(&image);

        assert!(markup.contains(r#"alt="say &quot;hi&quot; &amp; bye""#));
    }

    #[test]
    fn test_fragment_joins_lines() {
        let images = vec![ImageTag::with_src("data:,a"), ImageTag::with_src("data:,b")];

        assert_eq!(
            render_fragment(&images),
            "<img src=\"data:,a\"/>\n<img src=\"data:,b\"/>"
        );
        assert_eq!(render_fragment(&[]), "");
    }
}
