//! Response checks: status, declared headers, then body.

use crate::contract::media::select_response_for_status;
use crate::contract::OperationDef;
use crate::engine::body::check_body;
use crate::engine::findings::Findings;
use crate::engine::params::coerce_values;
use crate::model::NormalizedResponse;

pub(crate) fn check_response(
    operation: &OperationDef,
    response: &NormalizedResponse,
    findings: &mut Findings,
) {
    let Some(status) = response.status_code else {
        findings.push(
            "status.unknown",
            format!(
                "Response status missing for {} {}",
                operation.method, operation.path
            ),
        );
        return;
    };
    let Some(def) = select_response_for_status(&operation.responses, status) else {
        findings.push(
            "status.unknown",
            format!(
                "Response status {} not documented for {} {}",
                status, operation.method, operation.path
            ),
        );
        return;
    };

    for header in &def.headers {
        let values = response.header(&header.name).unwrap_or_default();
        if values.is_empty() {
            if header.required {
                findings.push(
                    "header.missing",
                    format!(
                        "Required response header '{}' is missing for status {}",
                        header.name, status
                    ),
                );
            }
            continue;
        }
        let Some(schema) = &header.schema else {
            continue;
        };
        let instance = coerce_values(values, schema, false);
        for violation in schema.errors(&instance) {
            findings.push(
                "header.schema",
                format!("Response header '{}': {}", header.name, violation),
            );
        }
    }

    if def.content.is_empty() {
        return;
    }
    match response.body.as_deref() {
        Some(body) => check_body(findings, &def.content, response.content_type(), body),
        None => findings.push(
            "body.missing",
            format!(
                "Response body is missing for status {} on {} {}",
                status, operation.method, operation.path
            ),
        ),
    }
}
