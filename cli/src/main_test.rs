use super::*;

#[test]
fn parse_point_accepts_comma_pairs() {
    assert_eq!(parse_point("10,20").expect("point"), Point::new(10.0, 20.0));
    assert_eq!(parse_point(" 1.5 , -2 ").expect("point"), Point::new(1.5, -2.0));
}

#[test]
fn parse_point_rejects_malformed_input() {
    assert!(parse_point("10").is_err());
    assert!(parse_point("a,2").is_err());
}

#[test]
fn parse_tool_uses_wire_names() {
    assert_eq!(parse_tool("rectangle"), Ok(DrawKind::Rectangle));
    assert!(parse_tool("spray").is_err());
}

#[test]
fn cli_parses_draw_command() {
    let cli = Cli::try_parse_from([
        "sketch-cli", "--user", "A", "draw", "r1", "--tool", "circle", "--from", "0,0", "--to", "3,4",
    ])
    .expect("valid args");
    assert_eq!(cli.user.as_deref(), Some("A"));
    let Command::Draw(args) = cli.command else { panic!("expected draw") };
    assert_eq!(args.tool, DrawKind::Circle);
    assert_eq!(args.color, "#000000");
    assert!((args.size - 5.0).abs() < f64::EPSILON);
}
