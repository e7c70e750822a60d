//! Request checks: parameters, then body.

use crate::contract::{OperationDef, ParamDef, ParamLocation};
use crate::engine::body::check_body;
use crate::engine::findings::Findings;
use crate::engine::params::coerce_values;
use crate::model::NormalizedRequest;
use indexmap::IndexMap;

pub(crate) fn check_request(
    operation: &OperationDef,
    path_params: &IndexMap<String, String>,
    request: &NormalizedRequest,
    findings: &mut Findings,
) {
    for param in &operation.parameters {
        check_parameter(operation, param, path_params, request, findings);
    }

    let body = request.body.as_deref();
    match (&operation.request_body, body) {
        (None, Some(_)) => findings.push(
            "body.unexpected",
            format!(
                "No request body is expected for {} on path '{}'",
                operation.method, operation.path
            ),
        ),
        (Some(def), None) if def.required => findings.push(
            "body.missing",
            format!(
                "{} on path '{}' requires a request body but none was provided",
                operation.method, operation.path
            ),
        ),
        (Some(def), Some(body)) => {
            check_body(findings, &def.content, request.content_type(), body)
        }
        _ => {}
    }
}

fn check_parameter(
    operation: &OperationDef,
    param: &ParamDef,
    path_params: &IndexMap<String, String>,
    request: &NormalizedRequest,
    findings: &mut Findings,
) {
    let values: Vec<String> = match param.location {
        ParamLocation::Path => path_params.get(&param.name).cloned().into_iter().collect(),
        ParamLocation::Query => request
            .query_parameters
            .get(&param.name)
            .cloned()
            .unwrap_or_default(),
        ParamLocation::Header => request
            .header(&param.name)
            .map(<[String]>::to_vec)
            .unwrap_or_default(),
        ParamLocation::Cookie => cookie_values(request, &param.name),
    };

    let label = location_label(param.location);
    if values.is_empty() {
        if param.required {
            findings.push(
                "parameter.missing",
                format!(
                    "{} parameter '{}' is required on path '{}' but not found in request",
                    label, param.name, operation.path
                ),
            );
        }
        return;
    }

    let Some(schema) = &param.schema else {
        return;
    };
    let instance = coerce_values(&values, schema, param.json_content);
    for violation in schema.errors(&instance) {
        findings.push(
            "parameter.schema",
            format!("{} parameter '{}': {}", label, param.name, violation),
        );
    }
}

fn location_label(location: ParamLocation) -> &'static str {
    match location {
        ParamLocation::Path => "Path",
        ParamLocation::Query => "Query",
        ParamLocation::Header => "Header",
        ParamLocation::Cookie => "Cookie",
    }
}

fn cookie_values(request: &NormalizedRequest, name: &str) -> Vec<String> {
    request
        .header("cookie")
        .unwrap_or_default()
        .iter()
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .filter(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .collect()
}
