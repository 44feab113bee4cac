//! Command-line surface.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use portal_core::{ClassroomId, GradeId, ResourceId, SubjectId, UserId};

#[derive(Debug, Parser)]
#[command(name = "portal", version, about = "Classroom portal client")]
pub struct Cli {
    /// Base URL of the portal API.
    #[arg(long, env = "PORTAL_API_BASE_URL", global = true)]
    pub api_url: Option<String>,

    /// File holding the access token between runs.
    #[arg(long, env = "PORTAL_TOKEN_FILE", global = true)]
    pub token_file: Option<PathBuf>,

    /// Accept self-signed TLS certificates (local development API).
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Log output format: `pretty` or `json`.
    #[arg(long, env = "PORTAL_LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Log in and remember the access token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log in with it.
    Register {
        #[arg(long)]
        email: String,
        #[arg(long, env = "PORTAL_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        full_name: String,
        /// Learner, Teacher or SuperAdmin.
        #[arg(long, default_value = "Learner")]
        role: String,
    },

    /// Forget the stored access token.
    Logout,

    /// Show the current session.
    Whoami,

    #[command(subcommand)]
    Classrooms(ClassroomsCommand),

    #[command(subcommand)]
    Resources(ResourcesCommand),

    /// Administration overview (admins only).
    Admin,

    /// Show where navigating to a path would land with the current session.
    Route { path: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ClassroomsCommand {
    /// List classrooms grouped by grade.
    List {
        /// Only show this grade.
        #[arg(long)]
        grade: Option<GradeId>,
    },

    /// Create a classroom taught by the logged-in teacher.
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "1")]
        grade: GradeId,
        #[arg(long, default_value = "1")]
        subject: SubjectId,
    },

    /// Enroll a learner in a classroom.
    Enroll {
        #[arg(long)]
        classroom: ClassroomId,
        #[arg(long)]
        learner: UserId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum ResourcesCommand {
    /// List resources of a classroom (defaults to the first classroom).
    List {
        #[arg(long)]
        classroom: Option<ClassroomId>,
        /// Only show one category.
        #[arg(long)]
        category: Option<String>,
    },

    /// Upload a file to a classroom.
    Upload {
        #[arg(long)]
        classroom: ClassroomId,
        file: PathBuf,
        #[arg(long, default_value = "Past Papers")]
        category: String,
    },

    /// Download a resource.
    Download {
        resource: ResourceId,
        /// Destination path; defaults to `resource-<id>.pdf`.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}
