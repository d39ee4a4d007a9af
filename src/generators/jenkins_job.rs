//! Jenkins pipeline job documents (`config.xml`).

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;

use super::GenerateError;

const XML_DECLARATION: &str = "<?xml version=\"1.1\" encoding=\"UTF-8\"?>\n";
const WORKFLOW_JOB_PLUGIN: &str = "workflow-job";
const CPS_FLOW_DEFINITION: &str = "org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition";
const WORKFLOW_CPS_PLUGIN: &str = "workflow-cps";
const SCRIPT_PATH: [&[u8]; 3] = [b"flow-definition", b"definition", b"script"];

#[derive(Serialize)]
#[serde(rename = "flow-definition")]
struct FlowDefinition<'a> {
    #[serde(rename = "@plugin")]
    plugin: &'static str,
    description: &'a str,
    #[serde(rename = "keepDependencies")]
    keep_dependencies: bool,
    definition: Definition<'a>,
    disabled: bool,
}

#[derive(Serialize)]
struct Definition<'a> {
    #[serde(rename = "@class")]
    class: &'static str,
    #[serde(rename = "@plugin")]
    plugin: &'static str,
    script: &'a str,
    sandbox: bool,
}

#[derive(Serialize)]
#[serde(rename = "hudson.model.ListView")]
struct ListView<'a> {
    name: &'a str,
    #[serde(rename = "filterExecutors")]
    filter_executors: bool,
    #[serde(rename = "filterQueue")]
    filter_queue: bool,
    recurse: bool,
}

/// Builds the `config.xml` of a sandboxed pipeline job.
pub fn job_config(description: &str, script: &str) -> Result<String, GenerateError> {
    let document = FlowDefinition {
        plugin: WORKFLOW_JOB_PLUGIN,
        description,
        keep_dependencies: false,
        definition: Definition {
            class: CPS_FLOW_DEFINITION,
            plugin: WORKFLOW_CPS_PLUGIN,
            script,
            sandbox: true,
        },
        disabled: false,
    };
    let body =
        quick_xml::se::to_string(&document).map_err(|e| GenerateError::Render(e.to_string()))?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Builds the `config.xml` of a list view that groups one user's jobs.
pub fn view_config(name: &str) -> Result<String, GenerateError> {
    let view = ListView {
        name,
        filter_executors: false,
        filter_queue: false,
        recurse: false,
    };
    let body = quick_xml::se::to_string(&view).map_err(|e| GenerateError::Render(e.to_string()))?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

/// Replaces the text of `flow-definition/definition/script`.
///
/// Every other event is copied through unchanged. Fails when the document
/// has no such element.
pub fn update_job_script(xml: &str, script: &str) -> Result<String, GenerateError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len() + script.len()));
    let mut path: Vec<Vec<u8>> = Vec::new();
    let mut replaced = false;

    loop {
        let event = reader.read_event().map_err(malformed)?;
        match event {
            Event::Eof => break,
            Event::Start(start) => {
                path.push(start.name().as_ref().to_vec());
                let is_target = !replaced && at_script(&path);
                write(&mut writer, Event::Start(start))?;
                if is_target {
                    skip_element(&mut reader)?;
                    path.pop();
                    write_script_body(&mut writer, script, false)?;
                    replaced = true;
                }
            }
            Event::Empty(empty) => {
                path.push(empty.name().as_ref().to_vec());
                let is_target = !replaced && at_script(&path);
                path.pop();
                if is_target {
                    write_script_body(&mut writer, script, true)?;
                    replaced = true;
                } else {
                    write(&mut writer, Event::Empty(empty))?;
                }
            }
            Event::End(end) => {
                path.pop();
                write(&mut writer, Event::End(end))?;
            }
            other => write(&mut writer, other)?,
        }
    }

    if !replaced {
        return Err(GenerateError::invalid(
            "config",
            "job document has no flow-definition/definition/script element",
        ));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| GenerateError::Render(e.to_string()))
}

fn at_script(path: &[Vec<u8>]) -> bool {
    path.len() == SCRIPT_PATH.len()
        && path
            .iter()
            .zip(SCRIPT_PATH)
            .all(|(segment, expected)| segment.as_slice() == expected)
}

/// Consumes events up to and including the end tag of the current element.
fn skip_element(reader: &mut Reader<&[u8]>) -> Result<(), GenerateError> {
    let mut depth = 0usize;
    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(_) => depth += 1,
            Event::End(_) if depth == 0 => return Ok(()),
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(GenerateError::invalid("config", "unterminated script element"));
            }
            _ => {}
        }
    }
}

fn write_script_body(
    writer: &mut Writer<Vec<u8>>,
    script: &str,
    open: bool,
) -> Result<(), GenerateError> {
    if open {
        write(writer, Event::Start(BytesStart::new("script")))?;
    }
    write(writer, Event::Text(BytesText::new(script)))?;
    write(writer, Event::End(BytesEnd::new("script")))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), GenerateError> {
    writer
        .write_event(event)
        .map_err(|e| GenerateError::Render(e.to_string()))
}

fn malformed(err: quick_xml::Error) -> GenerateError {
    GenerateError::invalid("config", format!("malformed job document: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct JobDocument {
        definition: Option<DefinitionDocument>,
    }

    #[derive(Deserialize)]
    struct DefinitionDocument {
        script: Option<String>,
    }

    fn job_script(xml: &str) -> Option<String> {
        let document: JobDocument = quick_xml::de::from_str(xml).unwrap();
        document.definition.and_then(|d| d.script)
    }

    const STORED: &str = r#"<?xml version='1.1' encoding='UTF-8'?>
<flow-definition plugin="workflow-job@1400.v7fd111b_ec82f">
  <actions/>
  <description>alice/blog &amp; friends</description>
  <keepDependencies>false</keepDependencies>
  <properties>
    <!-- managed by shipwright -->
    <org.jenkinsci.plugins.workflow.job.properties.DisableConcurrentBuildsJobProperty/>
  </properties>
  <definition class="org.jenkinsci.plugins.workflow.cps.CpsFlowDefinition" plugin="workflow-cps@3894.vd0f0248b_a_fc4">
    <script>pipeline { agent any; stages { stage(&apos;Old&apos;) { steps { echo &apos;a &amp;&amp; b&apos; } } } }</script>
    <sandbox>true</sandbox>
  </definition>
  <triggers/>
  <disabled>false</disabled>
</flow-definition>"#;

    fn around_script(xml: &str) -> (&str, &str) {
        let start = xml.find("<script>").unwrap() + "<script>".len();
        let end = xml.find("</script>").unwrap();
        (&xml[..start], &xml[end..])
    }

    #[test]
    fn job_config_embeds_script_in_cps_definition() {
        let script = "pipeline {\n  agent any\n  stages { stage('Build') { steps { sh 'make && make test' } } }\n}";
        let xml = job_config("alice/blog", script).unwrap();

        assert!(xml.starts_with("<?xml"));
        assert!(xml.contains("<flow-definition plugin=\"workflow-job\">"));
        assert!(xml.contains(CPS_FLOW_DEFINITION));
        assert!(xml.contains("<sandbox>true</sandbox>"));
        assert_eq!(job_script(&xml).as_deref(), Some(script));
    }

    #[test]
    fn view_config_is_a_list_view() {
        let xml = view_config("alice").unwrap();
        assert!(xml.contains("<hudson.model.ListView><name>alice</name>"));
    }

    #[test]
    fn update_replaces_only_the_script_text() {
        let new_script = "pipeline { stages { stage('New') { steps { sh 'a < b && c' } } } }";
        let updated = update_job_script(STORED, new_script).unwrap();

        assert_eq!(job_script(&updated).as_deref(), Some(new_script));

        let (before, after) = around_script(STORED);
        let (new_before, new_after) = around_script(&updated);
        assert_eq!(before, new_before);
        assert_eq!(after, new_after);
    }

    #[test]
    fn update_fills_an_empty_script_element() {
        let xml = "<flow-definition><definition><script/><sandbox>true</sandbox></definition></flow-definition>";
        let updated = update_job_script(xml, "echo hi").unwrap();
        assert_eq!(
            updated,
            "<flow-definition><definition><script>echo hi</script><sandbox>true</sandbox></definition></flow-definition>"
        );
    }

    #[test]
    fn document_without_script_is_rejected() {
        let xml = "<flow-definition><description>x</description><script>stray</script></flow-definition>";
        let err = update_job_script(xml, "echo").unwrap_err();
        assert!(err.is_validation());
    }
}
