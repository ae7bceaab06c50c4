//! CLI argument parsing using clap v4
//!
//! Defines the command-line interface for Nexus Hub. Each invocation opens
//! one view of the stored profile; `watch` keeps one open.

use clap::{Args, Parser, Subcommand};

/// Nexus Hub - persona-driven dashboard engine
///
/// Reads and edits the stored user profile, and shows which modules,
/// navigation entries and dashboard sections that profile unlocks.
#[derive(Parser, Debug)]
#[command(name = "nexus-hub")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "NEXUS_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Shared `--json` switch
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct OutputArgs {
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Inspect or reset the stored profile
    Profile {
        #[command(subcommand)]
        subcommand: ProfileSubcommand,
    },

    /// Show which surfaces the profile makes visible
    Visibility {
        #[command(flatten)]
        output: OutputArgs,

        /// Explain the rule deciding one surface (e.g. accountingHQ)
        #[arg(long, value_name = "SURFACE")]
        explain: Option<String>,
    },

    /// Show the composed navigation and dashboard
    Nav {
        #[command(flatten)]
        output: OutputArgs,

        /// List every entry, including disabled ones
        #[arg(short, long)]
        all: bool,
    },

    /// Flip a visibility flag (or force it with --on/--off)
    Toggle {
        /// Flag key, e.g. careerMode or engineeringHQ
        flag: String,

        /// Switch the flag on
        #[arg(long, conflicts_with = "off")]
        on: bool,

        /// Switch the flag off
        #[arg(long)]
        off: bool,
    },

    /// Edit the selected majors
    Major {
        #[command(subcommand)]
        subcommand: LabelSubcommand,
    },

    /// Edit the selected careers
    Career {
        #[command(subcommand)]
        subcommand: LabelSubcommand,
    },

    /// Set the TA / RA subject
    Subject {
        /// Subject name; empty restores the default
        text: String,
    },

    /// Set the role (student, worker)
    Role { role: String },

    /// Set the color theme
    Theme { name: String },

    /// Manage TA knowledge sources
    Source {
        #[command(subcommand)]
        subcommand: SourceSubcommand,
    },

    /// Move a dashboard section to a new position
    Reorder {
        /// Section: professional, academic, personal, accessibility
        section: String,

        /// Target position, 0-based (clamped to the last slot)
        index: usize,
    },

    /// Keep a view open and print the navigation whenever the profile changes
    Watch {
        /// Override the reconciliation poll interval
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },

    /// Call the assistant
    Assist {
        #[command(subcommand)]
        subcommand: AssistSubcommand,
    },

    /// Display version and build information
    Version {
        /// Print only the version line
        #[arg(short, long)]
        short: bool,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Profile subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ProfileSubcommand {
    /// Print the stored profile
    Show {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Delete the stored profile (the next read starts from the first-run profile)
    Reset,
}

/// Major/career list subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum LabelSubcommand {
    /// Select a label (no-op if already selected)
    Add { label: String },

    /// Deselect a label (no-op if not selected)
    Remove { label: String },

    /// Select or deselect a label
    Toggle { label: String },

    /// List selected labels and the built-in options
    List,
}

/// Knowledge source subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum SourceSubcommand {
    /// Add a source from inline text or a file
    Add {
        title: String,

        /// Source text
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        content: Option<String>,

        /// Read the source text from a file
        #[arg(long)]
        file: Option<String>,
    },

    /// Remove a source by id
    Remove { id: u64 },

    /// List sources
    List,
}

/// Assistant subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum AssistSubcommand {
    /// Ask a domain expert (legal, scientific, psychology, marketing, business, tech, gaap)
    Research { domain: String, query: String },

    /// Ask a question against your knowledge sources
    Chat { query: String },

    /// Grade a submission against a rubric
    Grade {
        /// Submission text
        submission: String,

        #[arg(long)]
        rubric: String,

        /// Subject (defaults to the profile's TA subject)
        #[arg(long)]
        subject: Option<String>,

        #[arg(long = "type", default_value = "Essay")]
        assignment_type: String,
    },

    /// Summarize text into study notes
    Summarize {
        text: String,

        #[arg(long, default_value = "General")]
        subject: String,
    },

    /// Analyze an accounting transaction
    Transaction { description: String },

    /// Solve an engineering problem
    Engineering { problem: String },

    /// Draft a document outline
    Draft {
        topic: String,

        /// Field (defaults to the profile's field)
        #[arg(long)]
        field: Option<String>,

        #[arg(long, default_value = "Research Paper")]
        kind: String,
    },

    /// Draft email variations
    Email {
        goal: String,

        #[arg(long, default_value = "")]
        context: String,
    },

    /// Read the text in an image file
    ReadImage { path: String },
}

/// Configuration subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate a configuration file
    Validate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        // Verifies that the CLI definition is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_profile_show_json() {
        let cli = Cli::parse_from(["nexus-hub", "profile", "show", "--json"]);
        match cli.command {
            Commands::Profile {
                subcommand: ProfileSubcommand::Show { output },
            } => assert!(output.json),
            _ => panic!("Expected Profile Show command"),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let cli = Cli::parse_from(["nexus-hub", "nav", "--config", "/tmp/hub.toml"]);
        assert_eq!(cli.config, Some("/tmp/hub.toml".to_string()));
        match cli.command {
            Commands::Nav { output, all } => {
                assert!(!output.json);
                assert!(!all);
            }
            _ => panic!("Expected Nav command"),
        }
    }

    #[test]
    fn test_toggle_on_off_conflict() {
        let cli = Cli::parse_from(["nexus-hub", "toggle", "engineeringHQ", "--on"]);
        match cli.command {
            Commands::Toggle { flag, on, off } => {
                assert_eq!(flag, "engineeringHQ");
                assert!(on);
                assert!(!off);
            }
            _ => panic!("Expected Toggle command"),
        }

        assert!(Cli::try_parse_from(["nexus-hub", "toggle", "budget", "--on", "--off"]).is_err());
    }

    #[test]
    fn test_major_add() {
        let cli = Cli::parse_from(["nexus-hub", "major", "add", "Mechanical Engineering"]);
        match cli.command {
            Commands::Major {
                subcommand: LabelSubcommand::Add { label },
            } => assert_eq!(label, "Mechanical Engineering"),
            _ => panic!("Expected Major Add command"),
        }
    }

    #[test]
    fn test_reorder_args() {
        let cli = Cli::parse_from(["nexus-hub", "reorder", "personal", "0"]);
        match cli.command {
            Commands::Reorder { section, index } => {
                assert_eq!(section, "personal");
                assert_eq!(index, 0);
            }
            _ => panic!("Expected Reorder command"),
        }
    }

    #[test]
    fn test_source_add_requires_content_or_file() {
        assert!(Cli::try_parse_from(["nexus-hub", "source", "add", "Notes"]).is_err());

        let cli = Cli::parse_from(["nexus-hub", "source", "add", "Notes", "--content", "Freud"]);
        match cli.command {
            Commands::Source {
                subcommand: SourceSubcommand::Add { title, content, file },
            } => {
                assert_eq!(title, "Notes");
                assert_eq!(content.as_deref(), Some("Freud"));
                assert!(file.is_none());
            }
            _ => panic!("Expected Source Add command"),
        }
    }

    #[test]
    fn test_assist_grade_defaults() {
        let cli = Cli::parse_from(["nexus-hub", "assist", "grade", "My essay", "--rubric", "thesis"]);
        match cli.command {
            Commands::Assist {
                subcommand:
                    AssistSubcommand::Grade {
                        submission,
                        rubric,
                        subject,
                        assignment_type,
                    },
            } => {
                assert_eq!(submission, "My essay");
                assert_eq!(rubric, "thesis");
                assert!(subject.is_none());
                assert_eq!(assignment_type, "Essay");
            }
            _ => panic!("Expected Assist Grade command"),
        }
    }

    #[test]
    fn test_verbose_flags() {
        let cli = Cli::parse_from(["nexus-hub", "-vv", "version"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_quiet_flag() {
        let cli = Cli::parse_from(["nexus-hub", "--quiet", "version"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["nexus-hub", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
