use clap::{ArgAction, Args, Parser};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ConfigOpts {
    #[arg(
        long,
        help = "Path of the global TOML config file (default: <config dir>/ctxcat/config.toml).",
        value_name = "PATH",
        conflicts_with = "no_config",
        help_heading = "Configuration"
    )]
    pub config: Option<String>,

    #[arg(
        long,
        help = "Do not load any global config file.",
        conflicts_with = "config",
        help_heading = "Configuration"
    )]
    pub no_config: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterOpts {
    #[arg(
        short = 'e',
        long = "ext",
        help = "Allowed file extensions, replacing the configured set (e.g. -e rs,toml).",
        value_name = "EXT",
        value_delimiter = ',',
        action = ArgAction::Append,
        help_heading = "Filters"
    )]
    pub extensions: Vec<String>,

    #[arg(
        short = 'x',
        long = "exclude",
        help = "Exclude paths matching a glob relative to the current directory.",
        value_name = "GLOB",
        action = ArgAction::Append,
        help_heading = "Filters"
    )]
    pub exclude: Vec<String>,

    #[arg(
        short = 'n',
        long = "exclude-name",
        help = "Exclude any file or directory whose name matches a glob.",
        value_name = "GLOB",
        action = ArgAction::Append,
        help_heading = "Filters"
    )]
    pub exclude_name: Vec<String>,

    #[arg(
        long,
        help = "Skip files ignored by .gitignore / .ignore files.",
        conflicts_with = "no_gitignore",
        help_heading = "Filters"
    )]
    pub gitignore: bool,

    #[arg(
        long,
        help = "Do not consult .gitignore / .ignore files.",
        conflicts_with = "gitignore",
        help_heading = "Filters"
    )]
    pub no_gitignore: bool,
}

#[derive(Args, Debug, Clone, Default)]
pub struct OutputOpts {
    #[arg(
        short = 'o',
        long,
        help = "Write the concatenated output to a file instead of stdout.",
        value_name = "PATH",
        help_heading = "Output"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Text written once before the first file.",
        value_name = "TEXT",
        help_heading = "Output"
    )]
    pub header: Option<String>,

    #[arg(
        long,
        help = "Marker line framing each file block.",
        value_name = "TEXT",
        help_heading = "Output"
    )]
    pub marker: Option<String>,

    #[arg(
        long,
        help = "Also write the scan result as pretty JSON.",
        value_name = "PATH",
        help_heading = "Output"
    )]
    pub report: Option<PathBuf>,

    #[arg(
        long,
        help = "List excluded files with the matching rule in the summary.",
        help_heading = "Output"
    )]
    pub show_excluded: bool,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Concatenate project files into a single context stream for language models.",
    long_about = "ctxcat walks a directory, filters files by extension, exclusion globs and \nignore files, and writes every included file framed by marker lines. \nExplicit -f files are always included and come first.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  ctxcat -d src -e rs,toml\n  ctxcat -x build -x 'docs/*.pdf' -o context.txt\n  ctxcat -f README.md --no-gitignore --show-excluded"
)]
pub struct Cli {
    #[arg(
        short = 'd',
        long = "dir",
        help = "Directory to scan (default: current directory).",
        value_name = "PATH"
    )]
    pub dir: Option<PathBuf>,

    #[arg(
        short = 'f',
        long = "file",
        help = "Include a file regardless of filters; may be repeated.",
        value_name = "PATH",
        action = ArgAction::Append
    )]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub filters: FilterOpts,

    #[command(flatten)]
    pub output: OutputOpts,

    #[command(flatten)]
    pub config: ConfigOpts,

    #[arg(short, long, action = ArgAction::Count, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(short, long, help = "Silence the summary, informational messages and warnings.")]
    pub quiet: bool,
}
