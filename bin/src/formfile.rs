//! Reading form definitions and parameter values given on the command line.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use cascade::{
    Form, ParameterName,
    param::config::FormConfig,
    value::{FormValue, ParameterValue, ValueSnapshot},
};

/// Reads the form configuration at `path`. Files ending in `.json` are read as JSON, anything
/// else as YAML.
pub fn read_form_config(path: &Path) -> Result<FormConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading form file {path:?}"))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let config = if is_json {
        FormConfig::from_json_str(&content)
    } else {
        FormConfig::from_yaml_str(&content)
    };
    config.with_context(|| format!("parsing form file {path:?}"))
}

pub fn load_form(path: &Path) -> Result<Form> {
    let config = read_form_config(path)?;
    Form::from_config(config).with_context(|| format!("loading form from {path:?}"))
}

/// Builds a [ValueSnapshot] from `NAME=VALUE` arguments. Giving the same name more than once
/// gives it a multiple value, in argument order.
pub fn parse_values(args: &[String]) -> Result<ValueSnapshot> {
    let mut values: Vec<(ParameterName, Vec<String>)> = Vec::new();
    for arg in args {
        let (name, value) = arg
            .split_once('=')
            .ok_or_else(|| anyhow!("value {arg:?} is not of the form NAME=VALUE"))?;
        let name = ParameterName::try_from(name.trim())
            .with_context(|| format!("parsing name in value {arg:?}"))?;
        match values.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, existing)) => existing.push(value.to_string()),
            None => values.push((name, vec![value.to_string()])),
        }
    }

    Ok(values
        .into_iter()
        .map(|(name, mut given)| {
            let value = if given.len() == 1 {
                FormValue::Single(given.remove(0))
            } else {
                FormValue::Multiple(given)
            };
            (name, value)
        })
        .collect())
}

/// Matches each submitted `{"name": ..., "value": ...}` entry to its parameter in `form`.
/// Entries naming no parameter of the form are skipped.
pub fn submitted_values(form: &Form, entries: &[serde_json::Value]) -> Vec<ParameterValue> {
    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name").and_then(serde_json::Value::as_str);
            match name.and_then(|name| form.get(name)) {
                Some(parameter) => Some(ParameterValue::from_submission(parameter, entry)),
                None => {
                    log::warn!("Skipping submitted entry {entry} for no parameter in the form.");
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use googletest::prelude::*;
    use test_casing::{TestCases, cases, test_casing};
    use testutils::WrapError;

    use super::*;

    const FORM_YAML: &str = r#"
parameters:
  - name: COUNTRY
    type: Choice
    spec:
      script:
        script: return ["uk", "fr"]
        sandbox: true
  - name: CITY
    type: Cascade
    spec:
      script:
        script: return []
        sandbox: true
      referenced_parameters: COUNTRY
"#;

    const FORM_JSON: &str = r#"{
  "parameters": [
    {
      "name": "COUNTRY",
      "type": "Choice",
      "spec": {"script": {"script": "return []", "sandbox": true}}
    }
  ]
}"#;

    fn write_temp(suffix: &str, content: &str) -> anyhow::Result<tempfile::NamedTempFile> {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile()?;
        file.write_all(content.as_bytes())?;
        Ok(file)
    }

    #[gtest]
    fn test_load_yaml_form() -> googletest::Result<()> {
        let file = write_temp(".yaml", FORM_YAML).wrap_error()?;

        let form = load_form(file.path()).wrap_error()?;

        expect_that!(form.len(), eq(2));
        expect_that!(form.graph().dependents_of("COUNTRY").len(), eq(1));
        Ok(())
    }

    #[gtest]
    fn test_load_json_form() -> googletest::Result<()> {
        let file = write_temp(".json", FORM_JSON).wrap_error()?;

        let form = load_form(file.path()).wrap_error()?;

        expect_that!(form.len(), eq(1));
        Ok(())
    }

    #[gtest]
    fn test_load_invalid_form() -> googletest::Result<()> {
        let file = write_temp(".yaml", "parameters: [{name: '', type: Choice, spec: {script: {}}}]")
            .wrap_error()?;

        let got = load_form(file.path());

        expect_that!(got, err(anything()));
        Ok(())
    }

    #[gtest]
    fn test_parse_values() -> googletest::Result<()> {
        let snapshot = parse_values(&[
            "COUNTRY=uk".to_string(),
            "COLOURS=red".to_string(),
            "COLOURS=blue".to_string(),
            "EMPTY=".to_string(),
        ])
        .wrap_error()?;

        expect_that!(snapshot.get("COUNTRY"), some(eq(&FormValue::Single("uk".into()))));
        expect_that!(snapshot.flat("COLOURS"), some(eq("red,blue")));
        expect_that!(snapshot.flat("EMPTY"), some(eq("")));
        Ok(())
    }

    #[gtest]
    fn test_submitted_values() -> googletest::Result<()> {
        let form = Form::from_config(FormConfig::from_yaml_str(FORM_YAML)?)?;
        let entries = vec![
            serde_json::json!({"name": "CITY", "value": ["London", "Leeds"]}),
            serde_json::json!({"name": "UNKNOWN", "value": "x"}),
            serde_json::json!({"value": "nameless"}),
            serde_json::json!({"name": "COUNTRY", "value": "uk"}),
        ];

        let values = submitted_values(&form, &entries);

        expect_that!(
            values
                .iter()
                .map(|value| format!("{}={}", value.name, value.value))
                .collect::<Vec<_>>(),
            elements_are![eq("CITY=London,Leeds"), eq("COUNTRY=uk")]
        );
        Ok(())
    }

    const INVALID_VALUE_CASES: TestCases<&'static str> = cases! {
        ["COUNTRY", "=uk", "not a name=uk"]
    };

    #[test_casing(3, INVALID_VALUE_CASES)]
    fn test_parse_invalid_value(arg: &'static str) {
        assert_that!(INVALID_VALUE_CASES, len(eq(3)));

        assert_that!(parse_values(&[arg.to_string()]), err(anything()));
    }
}
