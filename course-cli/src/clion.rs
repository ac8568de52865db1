//! CLion project integration
//!
//! Regenerates three artifacts under `.idea/` from the global matrix, one entry
//! per (target, profile) pair named `target.profile`:
//! - `tools/External Tools.xml`: an external tool that builds the pair
//! - `customTargets.xml`: a custom build target bound to that tool
//! - `workspace.xml`: run configurations (only the `RunManager` component is
//!   replaced; everything else in the file is kept)

use crate::config::CourseConfig;
use convenient_task::{Matrix, WorkItem};
use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ClionError {
    #[error("Idea project does not exist. Please open the project in CLion first.")]
    ProjectMissing(PathBuf),

    #[error("IO error on {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML serialization error: {0}")]
    Serialize(#[from] quick_xml::DeError),

    #[error("{0} has no root element")]
    NoRootElement(PathBuf),
}

pub type Result<T> = std::result::Result<T, ClionError>;

/// Command the generated tools invoke inside the dev shell
const CLI_COMMAND: &str = "course-cli";

const EMPTY_WORKSPACE: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<project version=\"4\">\n</project>\n";

// ---------- External Tools.xml ----------

#[derive(Debug, Serialize)]
#[serde(rename = "toolSet")]
struct ToolSet {
    #[serde(rename = "@name")]
    name: &'static str,
    tool: Vec<Tool>,
}

#[derive(Debug, Serialize)]
struct Tool {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@showInMainMenu")]
    show_in_main_menu: bool,
    #[serde(rename = "@showInEditor")]
    show_in_editor: bool,
    #[serde(rename = "@showInProject")]
    show_in_project: bool,
    #[serde(rename = "@showInSearchPopup")]
    show_in_search_popup: bool,
    #[serde(rename = "@disabled")]
    disabled: bool,
    #[serde(rename = "@useConsole")]
    use_console: bool,
    #[serde(rename = "@showConsoleOnStdOut")]
    show_console_on_std_out: bool,
    #[serde(rename = "@showConsoleOnStdErr")]
    show_console_on_std_err: bool,
    #[serde(rename = "@synchronizeAfterRun")]
    synchronize_after_run: bool,
    exec: ToolExec,
}

#[derive(Debug, Serialize)]
struct ToolExec {
    option: Vec<NamedValue>,
}

#[derive(Debug, Serialize)]
struct NamedValue {
    #[serde(rename = "@name")]
    name: &'static str,
    #[serde(rename = "@value")]
    value: String,
}

// ---------- customTargets.xml ----------

#[derive(Debug, Serialize)]
#[serde(rename = "project")]
struct CustomTargets {
    #[serde(rename = "@version")]
    version: u32,
    component: ExternalBuildManager,
}

#[derive(Debug, Serialize)]
struct ExternalBuildManager {
    #[serde(rename = "@name")]
    name: &'static str,
    target: Vec<CustomTarget>,
}

#[derive(Debug, Serialize)]
struct CustomTarget {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@defaultType")]
    default_type: &'static str,
    configuration: CustomTargetConfiguration,
}

#[derive(Debug, Serialize)]
struct CustomTargetConfiguration {
    #[serde(rename = "@name")]
    name: String,
    build: CustomTargetBuild,
}

#[derive(Debug, Serialize)]
struct CustomTargetBuild {
    #[serde(rename = "@type")]
    kind: &'static str,
    tool: ToolAction,
}

#[derive(Debug, Serialize)]
struct ToolAction {
    #[serde(rename = "@actionId")]
    action_id: String,
}

// ---------- workspace.xml RunManager ----------

#[derive(Debug, Serialize)]
#[serde(rename = "component")]
struct RunManager {
    #[serde(rename = "@name")]
    name: &'static str,
    configuration: Vec<RunConfiguration>,
}

#[derive(Debug, Serialize)]
struct RunConfiguration {
    #[serde(rename = "@name")]
    name: String,
    #[serde(rename = "@type")]
    kind: &'static str,
    #[serde(rename = "@factoryName")]
    factory_name: &'static str,
    #[serde(rename = "@REDIRECT_INPUT")]
    redirect_input: bool,
    #[serde(rename = "@ELEVATE")]
    elevate: bool,
    #[serde(rename = "@USE_EXTERNAL_CONSOLE")]
    use_external_console: bool,
    #[serde(rename = "@PASS_PARENT_ENVS_2")]
    pass_parent_envs: bool,
    #[serde(rename = "@PROJECT_NAME")]
    project_name: String,
    #[serde(rename = "@TARGET_NAME")]
    target_name: String,
    #[serde(rename = "@CONFIG_NAME")]
    config_name: String,
    #[serde(rename = "@RUN_PATH")]
    run_path: String,
    method: RunMethod,
}

#[derive(Debug, Serialize)]
struct RunMethod {
    #[serde(rename = "@v")]
    version: u32,
    option: BeforeRunOption,
}

#[derive(Debug, Serialize)]
struct BeforeRunOption {
    #[serde(rename = "@name")]
    name: &'static str,
    #[serde(rename = "@enabled")]
    enabled: bool,
}

/// Serialize with two-space indentation
fn to_xml<T: Serialize>(value: &T) -> Result<String> {
    let mut buffer = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
    serializer.indent(' ', 2);
    value.serialize(serializer)?;
    Ok(buffer)
}

fn is_run_manager(element: &BytesStart) -> Result<bool> {
    if element.name().as_ref() != b"component" {
        return Ok(false);
    }
    Ok(element
        .try_get_attribute("name")?
        .is_some_and(|attr| attr.value.as_ref() == b"RunManager"))
}

/// Re-emit every event of `fragment` into `writer`
fn copy_fragment(fragment: &str, writer: &mut Writer<Vec<u8>>) -> Result<()> {
    let mut reader = Reader::from_str(fragment);
    reader.trim_text(true);
    loop {
        match reader.read_event()? {
            Event::Eof => return Ok(()),
            event => writer.write_event(event)?,
        }
    }
}

/// Replace the `RunManager` component of a workspace document with `run_manager`
fn replace_run_manager(workspace: &str, run_manager: &str, path: &Path) -> Result<Vec<u8>> {
    let mut reader = Reader::from_str(workspace);
    reader.trim_text(true);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    let mut depth = 0usize;
    let mut inserted = false;

    loop {
        match reader.read_event()? {
            Event::Start(element) if depth == 1 && is_run_manager(&element)? => {
                let end = element.to_end().into_owned();
                reader.read_to_end(end.name())?;
            }
            Event::Empty(element) if depth == 1 && is_run_manager(&element)? => {}
            Event::Empty(element) if depth == 0 && !inserted => {
                // Self-closing root: open it to hold the component
                let end = element.to_end().into_owned();
                writer.write_event(Event::Start(element))?;
                copy_fragment(run_manager, &mut writer)?;
                writer.write_event(Event::End(end))?;
                inserted = true;
            }
            Event::Start(element) => {
                depth += 1;
                writer.write_event(Event::Start(element))?;
            }
            Event::End(element) => {
                depth = depth.saturating_sub(1);
                if depth == 0 && !inserted {
                    copy_fragment(run_manager, &mut writer)?;
                    inserted = true;
                }
                writer.write_event(Event::End(element))?;
            }
            Event::Eof => break,
            event => writer.write_event(event)?,
        }
    }

    if !inserted {
        return Err(ClionError::NoRootElement(path.to_path_buf()));
    }
    Ok(writer.into_inner())
}

/// The `.idea` directory of a course checkout
#[derive(Debug, Clone)]
pub struct ClionProject {
    idea_dir: PathBuf,
    project_name: String,
    cli_command: String,
}

impl ClionProject {
    /// Open the IDE project of the course
    ///
    /// Fails with [`ClionError::ProjectMissing`] before touching anything if CLion
    /// has not created `.idea` yet.
    pub fn open(config: &CourseConfig) -> Result<Self> {
        let idea_dir = config.idea_dir();
        if !idea_dir.is_dir() {
            return Err(ClionError::ProjectMissing(idea_dir));
        }

        let project_name = config
            .course_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            idea_dir,
            project_name,
            cli_command: CLI_COMMAND.to_string(),
        })
    }

    pub fn idea_dir(&self) -> &Path {
        &self.idea_dir
    }

    pub fn tools_path(&self) -> PathBuf {
        self.idea_dir.join("tools").join("External Tools.xml")
    }

    pub fn workspace_path(&self) -> PathBuf {
        self.idea_dir.join("workspace.xml")
    }

    pub fn custom_targets_path(&self) -> PathBuf {
        self.idea_dir.join("customTargets.xml")
    }

    /// Regenerate tools, run configurations and custom targets
    pub fn write_all(&self, matrix: &Matrix) -> Result<()> {
        let items = matrix.resolve(&Default::default());
        self.write_tools(&items)?;
        self.write_workspace(&items)?;
        self.write_custom_targets(&items)?;
        info!(
            "Wrote {} CLion targets to {}",
            items.len(),
            self.idea_dir.display()
        );
        Ok(())
    }

    fn write(path: &Path, content: impl AsRef<[u8]>) -> Result<()> {
        debug!("Writing {}", path.display());
        fs::write(path, content).map_err(|e| ClionError::Io(path.to_path_buf(), e))
    }

    fn tool_parameters(&self, item: &WorkItem) -> String {
        format!(
            " --experimental-features \"nix-command flakes\" develop $ProjectFileDir$/env \
             --command {} build -p {} -t {} --all",
            self.cli_command, item.profile, item.target
        )
    }

    pub fn write_tools(&self, items: &[WorkItem]) -> Result<()> {
        let tools = ToolSet {
            name: "External Tools",
            tool: items
                .iter()
                .map(|item| Tool {
                    name: item.to_string(),
                    show_in_main_menu: false,
                    show_in_editor: false,
                    show_in_project: false,
                    show_in_search_popup: false,
                    disabled: false,
                    use_console: true,
                    show_console_on_std_out: false,
                    show_console_on_std_err: false,
                    synchronize_after_run: true,
                    exec: ToolExec {
                        option: vec![
                            NamedValue {
                                name: "COMMAND",
                                value: "nix".to_string(),
                            },
                            NamedValue {
                                name: "PARAMETERS",
                                value: self.tool_parameters(item),
                            },
                        ],
                    },
                })
                .collect(),
        };

        let path = self.tools_path();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| ClionError::Io(dir.to_path_buf(), e))?;
        }
        Self::write(&path, to_xml(&tools)?)
    }

    pub fn write_custom_targets(&self, items: &[WorkItem]) -> Result<()> {
        let targets = CustomTargets {
            version: 4,
            component: ExternalBuildManager {
                name: "CLionExternalBuildManager",
                target: items
                    .iter()
                    .map(|item| {
                        let name = item.to_string();
                        CustomTarget {
                            default_type: "TOOL",
                            configuration: CustomTargetConfiguration {
                                name: name.clone(),
                                build: CustomTargetBuild {
                                    kind: "TOOL",
                                    tool: ToolAction {
                                        action_id: format!("Tool_External Tools_{}", name),
                                    },
                                },
                            },
                            name,
                        }
                    })
                    .collect(),
            },
        };

        Self::write(&self.custom_targets_path(), to_xml(&targets)?)
    }

    pub fn write_workspace(&self, items: &[WorkItem]) -> Result<()> {
        let run_manager = RunManager {
            name: "RunManager",
            configuration: items
                .iter()
                .map(|item| {
                    let name = item.to_string();
                    RunConfiguration {
                        kind: "CLionExternalRunConfiguration",
                        factory_name: "Application",
                        redirect_input: false,
                        elevate: false,
                        use_external_console: false,
                        pass_parent_envs: false,
                        project_name: self.project_name.clone(),
                        target_name: name.clone(),
                        config_name: name.clone(),
                        run_path: format!("$PROJECT_DIR$/build/{}/{}", item.profile, item.target),
                        method: RunMethod {
                            version: 2,
                            option: BeforeRunOption {
                                name: "CLION.EXTERNAL.BUILD",
                                enabled: true,
                            },
                        },
                        name,
                    }
                })
                .collect(),
        };

        let path = self.workspace_path();
        let existing = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => EMPTY_WORKSPACE.to_string(),
            Err(e) => return Err(ClionError::Io(path, e)),
        };

        let updated = replace_run_manager(&existing, &to_xml(&run_manager)?, &path)?;
        Self::write(&path, updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_replace_run_manager_keeps_other_components() {
        let workspace = r#"<?xml version="1.0" encoding="UTF-8"?>
<project version="4">
  <component name="ChangeListManager">
    <list default="true" id="abc" name="Changes" />
  </component>
  <component name="RunManager" selected="old.debug">
    <configuration name="old.debug" />
  </component>
</project>
"#;
        let fragment = r#"<component name="RunManager"><configuration name="new.release"/></component>"#;

        let out = replace_run_manager(workspace, fragment, Path::new("workspace.xml")).unwrap();
        let out = String::from_utf8(out).unwrap();

        assert!(out.contains("ChangeListManager"));
        assert!(out.contains("new.release"));
        assert!(!out.contains("old.debug"));
        assert_eq!(count(&out, "name=\"RunManager\""), 1);
    }

    #[test]
    fn test_replace_run_manager_in_self_closing_root() {
        let out = replace_run_manager(
            r#"<project version="4"/>"#,
            r#"<component name="RunManager"/>"#,
            Path::new("workspace.xml"),
        )
        .unwrap();
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("<project version=\"4\">"));
        assert!(out.contains("RunManager"));
        assert!(out.trim_end().ends_with("</project>"));
    }

    #[test]
    fn test_replace_run_manager_without_root() {
        let err = replace_run_manager("", "<component/>", Path::new("workspace.xml")).unwrap_err();
        assert!(matches!(err, ClionError::NoRootElement(_)));
    }

    #[test]
    fn test_tool_set_serialization() {
        let tools = ToolSet {
            name: "External Tools",
            tool: Vec::new(),
        };
        let xml = to_xml(&tools).unwrap();
        assert!(xml.starts_with("<toolSet"));
        assert!(xml.contains("name=\"External Tools\""));
    }
}
