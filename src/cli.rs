use crate::policy::EnforcementMode;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "preapply",
    version,
    about = "Deterministic risk analysis and policy gating for Terraform plans",
    after_help = "Exit codes:\n  0  success\n  1  runtime error (bad input, I/O failure, schema violation)\n  2  policy block (auto enforcement)\n  3  approval required (manual enforcement)\n\nExamples:\n  preapply analyze plan.json --json\n  preapply summary plan.json\n  preapply explain analysis.json aws_vpc.main\n  preapply policy check plan.json --policy-file policy.yaml --enforcement-mode auto\n  preapply report markdown -i analysis.json -o report.md\n  preapply report artifact -i analysis.json -o artifacts/",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Analyze a Terraform plan and report the risk assessment
    Analyze(AnalyzeArgs),
    /// Explain an assessment, or a single resource inside it
    Explain(ExplainArgs),
    /// One-paragraph summary of the risk assessment
    Summary(SummaryArgs),
    /// Policy enforcement commands
    #[command(subcommand)]
    Policy(PolicyCommand),
    /// Generate reports from a saved analysis (read-only)
    #[command(subcommand)]
    Report(ReportCommand),
}

#[derive(Subcommand, Debug)]
pub enum PolicyCommand {
    /// Evaluate policy rules against a plan analysis
    Check(PolicyCheckArgs),
}

#[derive(Subcommand, Debug)]
pub enum ReportCommand {
    /// Render a saved analysis as a markdown report
    Markdown(ReportMarkdownArgs),
    /// Write the CI artifact bundle from a saved analysis
    Artifact(ReportArtifactArgs),
}

#[derive(Parser, Debug)]
pub struct AnalyzeArgs {
    /// Terraform plan JSON file
    pub plan: PathBuf,

    /// Emit the structured CoreOutput JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Write the report to a file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Suppress progress messages
    #[arg(long)]
    pub quiet: bool,

    /// Configuration file (overrides PREAPPLY_CONFIG)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ExplainArgs {
    /// Terraform plan JSON or a previously saved analysis JSON
    pub input: PathBuf,

    /// Resource to explain (defaults to the overall assessment)
    pub resource_id: Option<String>,

    /// Emit structured JSON
    #[arg(long)]
    pub json: bool,

    /// List resource ids available for explanation
    #[arg(long)]
    pub list_resources: bool,

    /// Suppress progress messages
    #[arg(long)]
    pub quiet: bool,

    /// Configuration file (overrides PREAPPLY_CONFIG)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct SummaryArgs {
    /// Terraform plan JSON file
    pub plan: PathBuf,

    /// Emit structured JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress progress messages
    #[arg(long)]
    pub quiet: bool,

    /// Configuration file (overrides PREAPPLY_CONFIG)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct PolicyCheckArgs {
    /// Terraform plan JSON file
    pub plan: PathBuf,

    /// Policy YAML file
    #[arg(long, short = 'p', value_name = "FILE")]
    pub policy_file: PathBuf,

    /// Environment config file (.preapply-env.yaml shape)
    #[arg(long, value_name = "FILE")]
    pub environment: Option<PathBuf>,

    /// Override the enforcement mode from the environment file
    #[arg(long, value_enum)]
    pub enforcement_mode: Option<EnforcementModeArg>,

    /// Emit structured JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress progress messages
    #[arg(long)]
    pub quiet: bool,

    /// Configuration file (overrides PREAPPLY_CONFIG)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct ReportMarkdownArgs {
    /// Saved analysis JSON (CoreOutput format)
    #[arg(long, short = 'i', value_name = "FILE")]
    pub core_output: PathBuf,

    /// Output markdown file path
    #[arg(long, short, value_name = "FILE")]
    pub output: PathBuf,

    /// Suppress progress messages
    #[arg(long)]
    pub quiet: bool,
}

#[derive(Parser, Debug)]
pub struct ReportArtifactArgs {
    /// Saved analysis JSON (CoreOutput format)
    #[arg(long, short = 'i', value_name = "FILE")]
    pub core_output: PathBuf,

    /// Output directory for the artifact bundle
    #[arg(long, short, value_name = "DIR")]
    pub output: PathBuf,

    /// Suppress progress messages
    #[arg(long)]
    pub quiet: bool,
}

/// clap-facing mirror of [`EnforcementMode`].
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum EnforcementModeArg {
    Auto,
    Manual,
}

impl From<EnforcementModeArg> for EnforcementMode {
    fn from(arg: EnforcementModeArg) -> EnforcementMode {
        match arg {
            EnforcementModeArg::Auto => EnforcementMode::Auto,
            EnforcementModeArg::Manual => EnforcementMode::Manual,
        }
    }
}
