//! Batch Script - shell script invoking the engine once per record
//!
//! ```text
//! #!/bin/bash
//!
//! #SBATCH --nodelist <node>        <- scheduler directives, verbatim
//! #SBATCH --exclusive
//!
//! mkdir -p <log dir>               <- one per distinct log directory
//!
//! <engine> -p <config> > <log>     <- one job line per record
//! ...
//!
//! echo "" | mail -s <subject> <to> <- optional footer
//! ```

use serde::Deserialize;

use super::template::{Template, Vars};
use crate::{Error, Result};

/// Default interpreter line.
pub const DEFAULT_SHEBANG: &str = "#!/bin/bash";

/// Directory of job logs unless a log template is given.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default permission mode applied to generated scripts.
pub const DEFAULT_SCRIPT_MODE: u32 = 0o755;

/// How each job line is built and how the script is framed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSpec {
    shebang: String,
    directives: Vec<String>,
    engine: String,
    config_ref: Option<Template>,
    log: Option<Template>,
    notify: Option<String>,
    mode: Option<u32>,
}

impl JobSpec {
    /// Jobs running `engine` (e.g. `java -jar ISR.jar`), logging to
    /// `logs/<id>.log`.
    #[must_use]
    pub fn new(engine: impl Into<String>) -> Self {
        Self {
            shebang: DEFAULT_SHEBANG.to_string(),
            directives: Vec::new(),
            engine: engine.into(),
            config_ref: None,
            log: None,
            notify: None,
            mode: Some(DEFAULT_SCRIPT_MODE),
        }
    }

    /// Add a scheduler directive line (e.g. `#SBATCH --exclusive`).
    #[must_use]
    pub fn directive(mut self, line: impl Into<String>) -> Self {
        self.directives.push(line.into());
        self
    }

    /// Template for the log path that receives the job's stdout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the template does not parse.
    pub fn log(mut self, template: &str) -> Result<Self> {
        self.log = Some(Template::parse(template)?);
        Ok(self)
    }

    /// Template for the configuration path as seen by the job (for example
    /// a path on the cluster). Defaults to the local path.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] if the template does not parse.
    pub fn config_ref(mut self, template: &str) -> Result<Self> {
        self.config_ref = Some(Template::parse(template)?);
        Ok(self)
    }

    /// Mail `address` when the script finishes.
    #[must_use]
    pub fn notify(mut self, address: impl Into<String>) -> Self {
        self.notify = Some(address.into());
        self
    }

    /// Permission mode for the script (`None` leaves it untouched).
    #[must_use]
    pub const fn mode(mut self, mode: Option<u32>) -> Self {
        self.mode = mode;
        self
    }

    /// Replace the interpreter line.
    #[must_use]
    pub fn shebang(mut self, shebang: impl Into<String>) -> Self {
        self.shebang = shebang.into();
        self
    }

    /// Permission mode for generated scripts.
    #[must_use]
    pub const fn script_mode(&self) -> Option<u32> {
        self.mode
    }

    /// Templates the job line renders, for up-front validation.
    pub(crate) fn templates(&self) -> impl Iterator<Item = &Template> {
        self.config_ref.iter().chain(self.log.iter())
    }

    /// Build the job line for one record. `vars` must already contain
    /// `config` (the local path) and the record's placeholders.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] for unknown placeholders.
    pub fn job_line(&self, vars: &Vars) -> Result<String> {
        let config = match &self.config_ref {
            Some(template) => template.render(vars)?,
            None => lookup(vars, "config")?,
        };
        Ok(format!("{} -p {config} > {}", self.engine, self.log_path(vars)?))
    }

    /// Path the job's stdout is redirected to, as written in the script.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Template`] for unknown placeholders.
    pub fn log_path(&self, vars: &Vars) -> Result<String> {
        match &self.log {
            Some(template) => template.render(vars),
            None => Ok(format!("{DEFAULT_LOG_DIR}/{}.log", lookup(vars, "id")?)),
        }
    }

    /// Start an empty script for a group; `subject` labels the notification.
    #[must_use]
    pub fn script(&self, subject: &str) -> BatchScript {
        let mut header = vec![self.shebang.clone(), String::new()];
        if !self.directives.is_empty() {
            header.extend(self.directives.iter().cloned());
            header.push(String::new());
        }
        let footer = self
            .notify
            .as_ref()
            .map(|address| {
                let subject = if subject.is_empty() { "isr-expgen" } else { subject };
                vec![
                    String::new(),
                    format!("echo \"\" | mail -s {subject} {address}"),
                ]
            })
            .unwrap_or_default();
        BatchScript {
            header,
            log_dirs: Vec::new(),
            jobs: Vec::new(),
            footer,
        }
    }
}

fn lookup(vars: &Vars, name: &str) -> Result<String> {
    vars.get(name)
        .map(str::to_string)
        .ok_or_else(|| Error::Other(format!("job vars lack '{name}'")))
}

/// `[batch]` table of a grid file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobSpecConfig {
    /// Engine command line without `-p`
    pub engine: String,
    /// Interpreter line
    #[serde(default)]
    pub shebang: Option<String>,
    /// Scheduler directives
    #[serde(default)]
    pub directives: Vec<String>,
    /// Config path template as seen by the job
    #[serde(default)]
    pub config_ref: Option<String>,
    /// Log path template
    #[serde(default)]
    pub log: Option<String>,
    /// Notification address
    #[serde(default)]
    pub notify: Option<String>,
    /// Script permission mode; `0` disables the permission step
    #[serde(default)]
    pub mode: Option<u32>,
}

impl TryFrom<JobSpecConfig> for JobSpec {
    type Error = Error;

    fn try_from(config: JobSpecConfig) -> Result<Self> {
        let mut job = Self::new(config.engine);
        if let Some(shebang) = config.shebang {
            job = job.shebang(shebang);
        }
        for directive in config.directives {
            job = job.directive(directive);
        }
        if let Some(template) = config.config_ref {
            job = job.config_ref(&template)?;
        }
        if let Some(template) = config.log {
            job = job.log(&template)?;
        }
        if let Some(address) = config.notify {
            job = job.notify(address);
        }
        match config.mode {
            Some(0) => job = job.mode(None),
            Some(mode) => job = job.mode(Some(mode)),
            None => {}
        }
        Ok(job)
    }
}

/// A batch script under construction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchScript {
    header: Vec<String>,
    log_dirs: Vec<String>,
    jobs: Vec<String>,
    footer: Vec<String>,
}

impl BatchScript {
    /// Append a job line.
    pub fn push_job(&mut self, line: impl Into<String>) {
        self.jobs.push(line.into());
    }

    /// Make the script create `dir` before any job runs; repeated
    /// directories are created once.
    pub fn ensure_dir(&mut self, dir: impl Into<String>) {
        let dir = dir.into();
        if !self.log_dirs.contains(&dir) {
            self.log_dirs.push(dir);
        }
    }

    /// Directories created before the jobs, in order of first use.
    #[must_use]
    pub fn log_dirs(&self) -> &[String] {
        &self.log_dirs
    }

    /// Job lines in order.
    #[must_use]
    pub fn jobs(&self) -> &[String] {
        &self.jobs
    }

    /// Number of job lines.
    #[must_use]
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Full script text, newline-terminated.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.header {
            out.push_str(line);
            out.push('\n');
        }
        if !self.log_dirs.is_empty() {
            for dir in &self.log_dirs {
                out.push_str("mkdir -p ");
                out.push_str(dir);
                out.push('\n');
            }
            out.push('\n');
        }
        for line in self.jobs.iter().chain(&self.footer) {
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}
