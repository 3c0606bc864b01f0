use clap::Parser;
use std::path::PathBuf;
use tidy_up::Operation;

#[derive(Debug, Parser)] // requires `derive` feature
#[command(name = "tidy-up")]
#[command(about = "Clean files from given directories", long_about = None)]
pub struct Cli {
    /// Main directory to organize files to
    pub main_dir: PathBuf,

    /// Directories to clean
    #[arg(required = true, num_args = 1..)]
    pub directories: Vec<PathBuf>,

    /// Path to json configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Search for empty files and suggest deleting them
    #[arg(long)]
    pub empty: bool,

    /// Search for temporary files and suggest deleting them
    #[arg(long)]
    pub temporary: bool,

    /// Search for files with problematic characters and suggest renaming them
    #[arg(long)]
    pub problematic_characters: bool,

    /// Search for files with unusual permissions and suggest changing them
    #[arg(long)]
    pub unusual_attributes: bool,

    /// Search for files with repeated names and suggest keeping one of them
    #[arg(long)]
    pub repeated_names: bool,

    /// Search for files with duplicate content and suggest deleting some of them
    #[arg(long)]
    pub find_duplicate_content: bool,

    /// Move all files to main directory
    #[arg(long)]
    pub move_files_to_main_dir: bool,

    /// Copy all files to main directory
    #[arg(long)]
    pub copy_files_to_main_dir: bool,
}

impl Cli {
    pub fn operations(&self) -> Vec<Operation> {
        [
            (self.empty, Operation::Empty),
            (self.temporary, Operation::Temporary),
            (self.problematic_characters, Operation::ProblematicNames),
            (self.unusual_attributes, Operation::UnusualPermissions),
            (self.repeated_names, Operation::RepeatedNames),
            (self.find_duplicate_content, Operation::DuplicateContent),
            (self.move_files_to_main_dir, Operation::MoveToMain),
            (self.copy_files_to_main_dir, Operation::CopyToMain),
        ]
        .into_iter()
        .filter(|(selected, _)| *selected)
        .map(|(_, operation)| operation)
        .collect()
    }
}
