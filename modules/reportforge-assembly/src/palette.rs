//! Shared style palette: named color and alignment tokens used by the slide
//! manifests.

/// Resolve a color token to a hex string (no leading `#`). Literal hex
/// passes through; unknown tokens resolve to black with a warning.
pub fn resolve_color(token: &str) -> String {
    let named = match token {
        "WHITE" => "FFFFFF",
        "BLACK" => "000000",
        "DARK_GRAY" => "404040",
        "GRAY" => "808080",
        "LIGHT_GRAY" => "D9D9D9",
        "BLUE" => "4472C4",
        "LIGHT_BLUE" => "8FAADC",
        "NAVY" => "1F3864",
        "RED" => "C00000",
        "GREEN" => "70AD47",
        "ORANGE" => "ED7D31",
        "YELLOW" => "FFC000",
        "TEAL" => "4BACC6",
        "PURPLE" => "7030A0",
        _ => "",
    };
    if !named.is_empty() {
        return named.to_string();
    }

    let literal = token.trim_start_matches('#');
    if literal.len() == 6 && literal.chars().all(|c| c.is_ascii_hexdigit()) {
        return literal.to_uppercase();
    }

    tracing::warn!(token, "Unknown color token, defaulting to black");
    "000000".to_string()
}

/// Resolve an alignment token; unknown tokens default to left.
pub fn resolve_align(token: &str) -> &'static str {
    match token {
        "LEFT" => "left",
        "CENTER" => "center",
        "RIGHT" => "right",
        "JUSTIFY" => "justify",
        other => {
            tracing::warn!(token = other, "Unknown alignment token, defaulting to left");
            "left"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_colors_resolve() {
        assert_eq!(resolve_color("WHITE"), "FFFFFF");
        assert_eq!(resolve_color("BLUE"), "4472C4");
    }

    #[test]
    fn hex_literals_pass_through() {
        assert_eq!(resolve_color("#1a2b3c"), "1A2B3C");
        assert_eq!(resolve_color("AABBCC"), "AABBCC");
    }

    #[test]
    fn unknown_tokens_default_to_black() {
        assert_eq!(resolve_color("CHARTREUSE_MIST"), "000000");
    }

    #[test]
    fn alignment_tokens_resolve() {
        assert_eq!(resolve_align("CENTER"), "center");
        assert_eq!(resolve_align("???"), "left");
    }
}
