use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert_eq!(settings.server.graceful_shutdown, Duration::from_secs(30));
    assert_eq!(settings.destinations.timeout, Duration::from_secs(5));
    assert!(settings.destinations.email.is_none());
    assert!(settings.destinations.crm.is_none());
    assert!(settings.destinations.spreadsheet.is_none());
    assert_eq!(settings.content.project_id, None);
    assert_eq!(settings.content.dataset, "production");
    assert_eq!(settings.content.api_version, "2024-01-01");
    assert!(settings.content.use_cdn);
    assert_eq!(settings.listing.posts_per_page.get(), 9);
    assert_eq!(settings.listing.integrations_per_page.get(), 12);
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        destinations_timeout_seconds: Some(2),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    assert_eq!(settings.destinations.timeout, Duration::from_secs(2));
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn blank_credentials_leave_destination_unconfigured() {
    let mut raw = RawSettings::default();
    raw.destinations.crm.access_token = Some("   ".to_string());
    raw.destinations.spreadsheet.webhook_url = Some(String::new());

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(settings.destinations.crm.is_none());
    assert!(settings.destinations.spreadsheet.is_none());
}

#[test]
fn configured_destinations_use_default_api_bases() {
    let mut raw = RawSettings::default();
    raw.destinations.crm.access_token = Some("pat-123".to_string());
    raw.destinations.email.api_key = Some("re_123".to_string());
    raw.destinations.email.sales_inbox = Some("sales@yander.dev".to_string());
    raw.destinations.spreadsheet.webhook_url =
        Some("https://script.example.com/macros/s/abc/exec".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");

    let crm = settings.destinations.crm.expect("crm configured");
    assert_eq!(crm.api_base.as_str(), "https://api.hubapi.com/");
    let email = settings.destinations.email.expect("email configured");
    assert_eq!(email.api_base.as_str(), "https://api.resend.com/");
    assert_eq!(email.from, DEFAULT_EMAIL_FROM);
    assert!(settings.destinations.spreadsheet.is_some());
}

#[test]
fn email_without_sales_inbox_is_rejected() {
    let mut raw = RawSettings::default();
    raw.destinations.email.api_key = Some("re_123".to_string());

    let err = Settings::from_raw(raw).expect_err("missing inbox");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "destinations.email.sales_inbox",
            ..
        }
    ));
}

#[test]
fn invalid_webhook_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.destinations.spreadsheet.webhook_url = Some("not a url".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid url");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "destinations.spreadsheet.webhook_url",
            ..
        }
    ));
}

#[test]
fn zero_values_are_rejected() {
    let mut raw = RawSettings::default();
    raw.destinations.timeout_seconds = Some(0);
    assert!(Settings::from_raw(raw).is_err());

    let mut raw = RawSettings::default();
    raw.listing.posts_per_page = Some(0);
    assert!(matches!(
        Settings::from_raw(raw),
        Err(LoadError::Invalid {
            key: "listing.posts_per_page",
            ..
        })
    ));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["yander"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_render_arguments() {
    let args = CliArgs::parse_from(["yander", "render", "--toc", "/tmp/post.json"]);

    match args.command.expect("render command") {
        Command::Render(render) => {
            assert!(render.toc);
            assert_eq!(render.file, std::path::Path::new("/tmp/post.json"));
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "yander",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--destinations-timeout-seconds",
        "3",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(serve.overrides.destinations_timeout_seconds, Some(3));
        }
        _ => panic!("wrong command parsed"),
    }
}
