use super::*;

#[test]
fn arrow_and_zoom_keys_map_to_actions() {
    assert_eq!(map_key(egui::Key::ArrowLeft), Some(Key::Left));
    assert_eq!(map_key(egui::Key::ArrowDown), Some(Key::Down));
    assert_eq!(map_key(egui::Key::Plus), Some(Key::ZoomIn));
    assert_eq!(map_key(egui::Key::Equals), Some(Key::ZoomIn));
    assert_eq!(map_key(egui::Key::Minus), Some(Key::ZoomOut));
    assert_eq!(map_key(egui::Key::S), Some(Key::ToggleSelection));
    assert_eq!(map_key(egui::Key::Escape), Some(Key::Escape));
    assert_eq!(map_key(egui::Key::Space), Some(Key::Space));
}

#[test]
fn digit_keys_rate_one_to_five_only() {
    assert_eq!(map_key(egui::Key::Num1), Some(Key::Rate(1)));
    assert_eq!(map_key(egui::Key::Num5), Some(Key::Rate(5)));
    assert_eq!(map_key(egui::Key::Num6), None);
    assert_eq!(map_key(egui::Key::Num0), None);
    assert_eq!(map_key(egui::Key::A), None);
}

#[test]
fn wheel_up_zooms_in() {
    // egui reports scrolling up as a positive content delta
    let g = wheel_gesture(
        egui::MouseWheelUnit::Point,
        Vec2::new(0.0, 40.0),
        egui::Modifiers::NONE,
        120.0,
    );
    assert_eq!(g.delta_y, -40.0);
    assert_eq!(g.unit, WheelUnit::Pixel);
    assert!(!g.modifier);
    match crate::timeline::transform::interpret_wheel(&g) {
        Some(crate::timeline::transform::TransformChange::Zoom { factor, focal_x }) => {
            assert!(factor > 1.0);
            assert_eq!(focal_x, 120.0);
        }
        other => panic!("expected zoom, got {:?}", other),
    }
}

#[test]
fn ctrl_horizontal_wheel_pans() {
    let g = wheel_gesture(
        egui::MouseWheelUnit::Line,
        Vec2::new(-3.0, 1.0),
        egui::Modifiers::CTRL,
        0.0,
    );
    assert!(g.modifier);
    assert_eq!(g.unit, WheelUnit::Line);
    assert!(matches!(
        crate::timeline::transform::interpret_wheel(&g),
        Some(crate::timeline::transform::TransformChange::Pan { .. })
    ));
}

#[test]
fn tooltip_text_is_truncated() {
    let long = "x".repeat(400);
    let t = truncate_chars(&long, TOOLTIP_CHARS);
    assert_eq!(t.chars().count(), TOOLTIP_CHARS + 3);
    assert!(t.ends_with("..."));
    assert_eq!(truncate_chars("short", TOOLTIP_CHARS), "short");
    // Multi-byte characters are counted, not bytes
    assert_eq!(truncate_chars("ééé", 2), "éé...");
}

#[test]
fn stars_show_rating() {
    assert_eq!(stars_label(Rating::new(3)), "★★★☆☆");
    assert_eq!(stars_label(None), "☆☆☆☆☆");
}

#[test]
fn times_render_in_offset() {
    let offset = FixedOffset::east_opt(2 * 3600).unwrap();
    assert_eq!(format_time(1_700_000_000_000, offset), "2023-11-15 00:13:20");
}
