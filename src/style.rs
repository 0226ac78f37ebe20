use std::sync::LazyLock;

use fancy_regex::Regex;

static TRANSLATE_X: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"translateX\(\s*(-?(?:\d+(?:\.\d*)?|\.\d+))%\s*\)").ok()
});

pub(crate) fn translate_x(offset_percent: i64) -> String {
    format!("translateX({offset_percent}%)")
}

/// Extracts the percentage from a `translateX(N%)` transform, if present.
///
/// Returns `None` for transforms that do not translate along X in percent
/// (pixel offsets, `translate3d`, empty values).
pub fn parse_translate_x_percent(transform: &str) -> Option<f64> {
    let re = TRANSLATE_X.as_ref()?;
    let captures = re.captures(transform).ok()??;
    captures.get(1)?.as_str().parse::<f64>().ok()
}

pub(crate) fn js_prop_to_css_name(prop: &str) -> String {
    let mut out = String::new();
    for ch in prop.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

pub(crate) fn parse_style_declarations(style_attr: Option<&str>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let Some(style_attr) = style_attr else {
        return out;
    };

    for decl in style_attr.split(';') {
        let decl = decl.trim();
        if decl.is_empty() {
            continue;
        }
        let Some((name, value)) = decl.split_once(':') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        let value = value.trim().to_string();
        if let Some(pos) = out.iter().position(|(existing, _)| existing == &name) {
            out[pos].1 = value;
        } else {
            out.push((name, value));
        }
    }

    out
}

pub(crate) fn serialize_style_declarations(decls: &[(String, String)]) -> String {
    let mut out = String::new();
    for (idx, (name, value)) in decls.iter().enumerate() {
        if idx > 0 {
            out.push(' ');
        }
        out.push_str(name);
        out.push_str(": ");
        out.push_str(value);
        out.push(';');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn translate_x_reads_back_slide_offsets() {
        assert_eq!(translate_x(0), "translateX(0%)");
        assert_eq!(parse_translate_x_percent(&translate_x(-300)), Some(-300.0));
        assert_eq!(parse_translate_x_percent("translateX( 12.5% )"), Some(12.5));
        assert_eq!(parse_translate_x_percent("translateX(-0%)"), Some(0.0));
    }

    #[test]
    fn translate_x_ignores_other_transforms() {
        assert_eq!(parse_translate_x_percent(""), None);
        assert_eq!(parse_translate_x_percent("translateX(20px)"), None);
        assert_eq!(parse_translate_x_percent("scale(1.05)"), None);
    }

    #[test]
    fn style_declarations_last_duplicate_wins() {
        let decls = parse_style_declarations(Some("Display: block; ; color:red; display:none"));
        assert_eq!(
            decls,
            vec![
                ("display".to_string(), "none".to_string()),
                ("color".to_string(), "red".to_string()),
            ]
        );
        assert_eq!(serialize_style_declarations(&decls), "display: none; color: red;");
    }

    #[test]
    fn camel_case_props_become_kebab_case() {
        assert_eq!(js_prop_to_css_name("backgroundColor"), "background-color");
        assert_eq!(js_prop_to_css_name("transform"), "transform");
    }
}
