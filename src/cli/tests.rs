#[cfg(test)]
mod tests {
    use crate::audio::graph::LoopCount;
    use crate::cli::{parse_loop_count, CliApp, Command, ParseError};
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_parse_command_open() {
        assert_eq!(
            CliApp::parse_command("open /clips/beep.wav").unwrap(),
            Command::Open { path: PathBuf::from("/clips/beep.wav") }
        );

        // Paths may contain spaces
        assert_eq!(
            CliApp::parse_command("o /clips/my beep.flac").unwrap(),
            Command::Open { path: PathBuf::from("/clips/my beep.flac") }
        );

        assert!(matches!(
            CliApp::parse_command("open"),
            Err(ParseError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_command_transport() {
        let cases = [
            ("play", Command::Play),
            ("p", Command::Play),
            ("stop", Command::Stop),
            ("s", Command::Stop),
            ("eject", Command::Eject),
            ("forward", Command::Forward),
            ("f", Command::Forward),
            ("back", Command::Back),
            ("b", Command::Back),
            ("wave", Command::Wave),
            ("watch", Command::Watch),
            ("status", Command::Status),
            ("quit", Command::Quit),
            ("exit", Command::Quit),
            ("  play  ", Command::Play),
        ];

        for (input, expected) in cases {
            assert_eq!(CliApp::parse_command(input).unwrap(), expected, "input {:?}", input);
        }
    }

    #[test]
    fn test_parse_command_seek() {
        assert_eq!(
            CliApp::parse_command("seek 5").unwrap(),
            Command::Seek { delta_secs: 5.0 }
        );
        assert_eq!(
            CliApp::parse_command("seek -2.5").unwrap(),
            Command::Seek { delta_secs: -2.5 }
        );
        assert_eq!(
            CliApp::parse_command("seek +1:30").unwrap(),
            Command::Seek { delta_secs: 90.0 }
        );

        assert!(matches!(
            CliApp::parse_command("seek"),
            Err(ParseError::MissingArgument { .. })
        ));
        assert!(matches!(
            CliApp::parse_command("seek soon"),
            Err(ParseError::InvalidTimeFormat { .. })
        ));
    }

    #[test]
    fn test_parse_command_goto() {
        assert_eq!(CliApp::parse_command("goto 50").unwrap(), Command::Goto { ratio: 0.5 });
        assert_eq!(CliApp::parse_command("g 25%").unwrap(), Command::Goto { ratio: 0.25 });
        // Out of range values are left for the transport to clamp
        assert_eq!(CliApp::parse_command("goto 150").unwrap(), Command::Goto { ratio: 1.5 });
        assert!(matches!(
            CliApp::parse_command("goto half"),
            Err(ParseError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_parse_command_volume() {
        for level in [0u8, 50, 100] {
            assert_eq!(
                CliApp::parse_command(&format!("volume {}", level)).unwrap(),
                Command::Volume { level }
            );
        }
        assert_eq!(CliApp::parse_command("v 70").unwrap(), Command::Volume { level: 70 });

        for bad in ["volume 101", "volume -1", "volume loud"] {
            assert!(
                matches!(CliApp::parse_command(bad), Err(ParseError::InvalidArgument { .. })),
                "input {:?}",
                bad
            );
        }
        assert!(matches!(
            CliApp::parse_command("volume"),
            Err(ParseError::MissingArgument { .. })
        ));
    }

    #[test]
    fn test_parse_command_hq() {
        assert_eq!(CliApp::parse_command("hq on").unwrap(), Command::Hq { enabled: true });
        assert_eq!(CliApp::parse_command("hq off").unwrap(), Command::Hq { enabled: false });
        assert!(matches!(
            CliApp::parse_command("hq maybe"),
            Err(ParseError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_parse_command_errors() {
        assert!(matches!(CliApp::parse_command(""), Err(ParseError::EmptyCommand)));
        assert!(matches!(CliApp::parse_command("   "), Err(ParseError::EmptyCommand)));
        assert!(matches!(CliApp::parse_command("help"), Err(ParseError::HelpRequested)));
        match CliApp::parse_command("rewind") {
            Err(ParseError::UnknownCommand { command }) => assert_eq!(command, "rewind"),
            other => panic!("Expected UnknownCommand, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_offset() {
        assert_eq!(CliApp::parse_offset("10").unwrap(), 10.0);
        assert_eq!(CliApp::parse_offset("10s").unwrap(), 10.0);
        assert_eq!(CliApp::parse_offset("-0.5").unwrap(), -0.5);
        assert_eq!(CliApp::parse_offset("2:05").unwrap(), 125.0);
        assert_eq!(CliApp::parse_offset("-0:30.5").unwrap(), -30.5);

        for bad in ["", "-", "1:60", "1:2:3", "abc", "--5", "inf"] {
            assert!(
                matches!(CliApp::parse_offset(bad), Err(ParseError::InvalidTimeFormat { .. })),
                "input {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_parse_loop_count() {
        assert_eq!(parse_loop_count("0").unwrap(), LoopCount::Times(0));
        assert_eq!(parse_loop_count("3").unwrap(), LoopCount::Times(3));
        assert_eq!(parse_loop_count("forever").unwrap(), LoopCount::Forever);
        assert!(parse_loop_count("-1").is_err());
    }

    #[test]
    fn test_command_line_arguments() {
        let cli = CliApp::try_parse_from(["quickclip", "beep.wav", "--volume", "40", "--loop", "forever", "--lq"])
            .unwrap();
        assert_eq!(cli.file, Some(PathBuf::from("beep.wav")));
        assert_eq!(cli.volume, Some(40));
        assert_eq!(cli.loop_count, Some(LoopCount::Forever));
        assert!(cli.lq);
        assert_eq!(cli.width, 64);

        assert!(CliApp::try_parse_from(["quickclip", "--volume", "140"]).is_err());
        assert!(CliApp::try_parse_from(["quickclip", "--loop", "twice"]).is_err());
    }

    #[test]
    fn test_expand_path() {
        let expanded = CliApp::expand_path("~/Music/beep.wav");
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("Music/beep.wav"));

        assert_eq!(CliApp::expand_path("relative/beep.wav"), PathBuf::from("relative/beep.wav"));
        assert_ne!(CliApp::expand_path("~").to_string_lossy(), "~");
    }

    #[test]
    fn test_parse_error_display() {
        let error = ParseError::InvalidArgument {
            argument: "volume level".to_string(),
            value: "loud".to_string(),
            expected: "0-100".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid argument volume level: got 'loud', expected 0-100"
        );
        assert_eq!(
            ParseError::UnknownCommand { command: "x".to_string() }.to_string(),
            "Unknown command: x"
        );
    }
}
