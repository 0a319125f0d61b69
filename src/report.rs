//! CSV output.
//!
//! Two kinds of output are supported:
//! * streaming reports, one file per `Report` type, registered with `add_report` and
//!   appended to row by row with `send_report`;
//! * snapshots, complete files written in one call with `write_snapshot`.
//!
//! Both honor the `ReportOptions` of the context: every file lands in
//! `directory/{file_prefix}{name}.csv`, and an existing file is only replaced when
//! `overwrite` is set.
use std::any::TypeId;
use std::cell::{RefCell, RefMut};
use std::env;
use std::fs::{create_dir_all, File};
use std::path::{Path, PathBuf};

use csv::Writer;
use serde::Serialize;

use crate::context::Context;
use crate::define_data_plugin;
use crate::error::AbmError;
use crate::hashing::HashMap;
use crate::log::{error, trace};

pub trait Report: 'static {
    fn type_id(&self) -> TypeId;
    fn serialize(&self, writer: &mut Writer<File>);
}

/// Implements `Report` for a `Serialize` row type.
#[macro_export]
macro_rules! define_report {
    ($name:ident) => {
        impl $crate::report::Report for $name {
            fn type_id(&self) -> std::any::TypeId {
                std::any::TypeId::of::<$name>()
            }

            fn serialize(&self, writer: &mut $crate::csv::Writer<std::fs::File>) {
                writer.serialize(self).expect("Failed to serialize report row");
            }
        }
    };
}
pub use define_report;

pub struct ReportOptions {
    pub file_prefix: String,
    pub directory: PathBuf,
    pub overwrite: bool,
}

impl ReportOptions {
    /// Defaults: no prefix, the current working directory, no overwriting.
    #[must_use]
    pub fn new() -> ReportOptions {
        ReportOptions {
            file_prefix: String::new(),
            directory: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            overwrite: false,
        }
    }

    pub fn file_prefix(&mut self, file_prefix: String) -> &mut ReportOptions {
        self.file_prefix = file_prefix;
        self
    }

    pub fn directory(&mut self, directory: PathBuf) -> &mut ReportOptions {
        self.directory = directory;
        self
    }

    pub fn overwrite(&mut self, overwrite: bool) -> &mut ReportOptions {
        self.overwrite = overwrite;
        self
    }

    fn path_for(&self, short_name: &str) -> PathBuf {
        self.directory
            .join(format!("{}{short_name}.csv", self.file_prefix))
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new()
    }
}

struct ReportData {
    file_writers: RefCell<HashMap<TypeId, Writer<File>>>,
    config: ReportOptions,
}

define_data_plugin!(
    ReportPlugin,
    ReportData,
    ReportData {
        file_writers: RefCell::new(HashMap::default()),
        config: ReportOptions::new(),
    }
);

/// Creates `path` (and its parent directories) for writing.
fn create_report_file(path: &Path, overwrite: bool) -> Result<File, AbmError> {
    if path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
        return Err(AbmError::ReportError(
            "Report output files must be CSVs".to_string(),
        ));
    }
    if !overwrite && path.exists() {
        error!("report file already exists: {}", path.display());
        return Err(AbmError::ReportError(format!(
            "File already exists: {}. Please set `overwrite` to true in the report options.",
            path.display()
        )));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

pub trait ContextReportExt {
    /// Options applied to every report added afterwards.
    fn report_options(&mut self) -> &mut ReportOptions;

    /// Opens `{prefix}{short_name}.csv` for rows of type `T`.
    ///
    /// # Errors
    ///
    /// Fails if the file exists and overwriting is off, or if it cannot be created.
    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), AbmError>;

    /// Whether `add_report::<T>` has been called.
    fn is_report_registered<T: Report>(&self) -> bool;

    /// Appends one row to the report for `T` and flushes it.
    ///
    /// # Panics
    ///
    /// Panics if no report was added for `T`.
    fn send_report<T: Report>(&self, report: T);

    /// Writes a complete CSV file named `{prefix}{short_name}.csv` from `rows`.
    ///
    /// # Errors
    ///
    /// Fails if the file exists and overwriting is off, or on any I/O or CSV error.
    fn write_snapshot<T: Serialize>(
        &mut self,
        short_name: &str,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<PathBuf, AbmError>;
}

impl ContextReportExt for Context {
    fn report_options(&mut self) -> &mut ReportOptions {
        &mut self.get_data_container_mut(ReportPlugin).config
    }

    fn add_report<T: Report>(&mut self, short_name: &str) -> Result<(), AbmError> {
        let data_container = self.get_data_container_mut(ReportPlugin);
        let path = data_container.config.path_for(short_name);
        trace!("adding report {}", path.display());
        let file = create_report_file(&path, data_container.config.overwrite)?;
        data_container
            .file_writers
            .borrow_mut()
            .insert(TypeId::of::<T>(), Writer::from_writer(file));
        Ok(())
    }

    fn is_report_registered<T: Report>(&self) -> bool {
        self.get_data_container(ReportPlugin)
            .is_some_and(|data| data.file_writers.borrow().contains_key(&TypeId::of::<T>()))
    }

    fn send_report<T: Report>(&self, report: T) {
        let data_container = self
            .get_data_container(ReportPlugin)
            .expect("No writer found for the report type");
        let mut writers: RefMut<'_, _> = data_container.file_writers.borrow_mut();
        let writer = writers
            .get_mut(&report.type_id())
            .expect("No writer found for the report type");
        report.serialize(writer);
        writer.flush().expect("Failed to flush writer");
    }

    fn write_snapshot<T: Serialize>(
        &mut self,
        short_name: &str,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<PathBuf, AbmError> {
        let config = &self.get_data_container_mut(ReportPlugin).config;
        let path = config.path_for(short_name);
        let file = create_report_file(&path, config.overwrite)?;
        let mut writer = Writer::from_writer(file);
        for row in rows {
            writer.serialize(row)?;
        }
        writer.flush()?;
        trace!("wrote snapshot {}", path.display());
        Ok(path)
    }
}
