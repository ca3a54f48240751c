use footprint::marker::{MarkerStyle, ALL_STYLES};

/// CSS class a marker carries while painted with `style`.
pub fn marker_class(style: &MarkerStyle) -> String {
    format!("marker-{}", style.name)
}

fn marker_rule(style: &MarkerStyle) -> String {
    let size = (style.radius * 2.0).round() as i32;
    format!(
        ".{class} {{
            background-color: alpha({fill}, {opacity});
            border: 2px solid {stroke};
            min-width: {size}px;
            min-height: {size}px;
        }}
        .legend-dot.{class} {{
            min-width: 10px;
            min-height: 10px;
        }}
        ",
        class = marker_class(style),
        fill = style.fill,
        opacity = style.fill_opacity,
        stroke = style.stroke,
        size = size,
    )
}

pub fn stylesheet() -> String {
    let mut css = String::from(
        ".map-marker {
            border-radius: 999px;
            padding: 0;
            box-shadow: 0 2px 6px alpha(black, 0.4);
            transition: background-color 200ms ease-in-out;
        }
        .legend-dot {
            border-radius: 999px;
            padding: 0;
        }
        .map-popover > contents {
            background-color: alpha(@card_bg_color, 0.95);
            border-radius: 12px;
            box-shadow: 0 4px 16px alpha(black, 0.6);
        }
        .map-legend {
            background-color: alpha(@window_bg_color, 0.85);
            border-radius: 12px;
            padding: 8px 12px;
            font-size: 11px;
        }
        .experience-card {
            padding: 12px;
            border-radius: 12px;
        }
        .experience-company {
            font-weight: bold;
            font-size: 15px;
            padding: 0;
        }
        .experience-period {
            font-size: 11px;
            color: alpha(@window_fg_color, 0.6);
        }
        .location-chip {
            background-color: alpha(@accent_bg_color, 0.2);
            border-radius: 12px;
            padding: 2px 10px;
            font-size: 11px;
            min-height: 0;
        }
        .chat-bubble {
            border-radius: 12px;
            padding: 8px 12px;
        }
        .chat-user {
            background-color: alpha(@accent_bg_color, 0.35);
        }
        .chat-model {
            background-color: alpha(@card_bg_color, 0.9);
        }
        .chat-error {
            background-color: alpha(@error_bg_color, 0.35);
        }
        ",
    );
    for style in &ALL_STYLES {
        css.push_str(&marker_rule(style));
    }
    css
}
