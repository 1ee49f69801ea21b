use crate::error::FieldError;

use super::payload::ItemPayload;

/// One declarative request rule. Rules are evaluated in order and never
/// short-circuit: every failing rule contributes one entry to the returned
/// list, so a client can fix all of its problems in one round trip.
struct Rule {
    param: &'static str,
    msg: &'static str,
    check: fn(&ItemPayload) -> bool,
}

fn name_present(p: &ItemPayload) -> bool {
    p.name.as_deref().is_some_and(|s| !s.is_empty())
}

fn name_nonempty_if_present(p: &ItemPayload) -> bool {
    p.name.as_deref().map_or(true, |s| !s.is_empty())
}

fn description_present(p: &ItemPayload) -> bool {
    p.description.as_deref().is_some_and(|s| !s.is_empty())
}

fn description_nonempty_if_present(p: &ItemPayload) -> bool {
    p.description.as_deref().map_or(true, |s| !s.is_empty())
}

fn quantity_is_integer(p: &ItemPayload) -> bool {
    p.quantity
        .as_deref()
        .is_some_and(|s| s.trim().parse::<i32>().is_ok())
}

/// Non-negativity only fires on parseable input; a missing or non-integer
/// quantity is already covered by the integer rule.
fn quantity_non_negative(p: &ItemPayload) -> bool {
    match p.quantity.as_deref().map(|s| s.trim().parse::<i32>()) {
        Some(Ok(n)) => n >= 0,
        _ => true,
    }
}

fn quantity_integer_if_present(p: &ItemPayload) -> bool {
    match p.quantity.as_deref() {
        Some(s) => s.trim().parse::<i32>().map(|n| n >= 0).unwrap_or(false),
        None => true,
    }
}

fn image_present_and_valid(p: &ItemPayload) -> bool {
    p.image.as_ref().is_some_and(|img| {
        img.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    })
}

fn image_valid_if_present(p: &ItemPayload) -> bool {
    p.image.as_ref().map_or(true, |img| {
        img.content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("image/"))
    })
}

static CREATE_RULES: &[Rule] = &[
    Rule {
        param: "name",
        msg: "Name must exist and be a string of at least length 1",
        check: name_present,
    },
    Rule {
        param: "description",
        msg: "Description must exist and be a string of at least length 1",
        check: description_present,
    },
    Rule {
        param: "quantity",
        msg: "quantity must exist and be an integer value",
        check: quantity_is_integer,
    },
    Rule {
        param: "quantity",
        msg: "You must submit a quantity property with a positive integer value",
        check: quantity_non_negative,
    },
    Rule {
        param: "image",
        msg: "You must submit a valid image file",
        check: image_present_and_valid,
    },
];

static UPDATE_RULES: &[Rule] = &[
    Rule {
        param: "name",
        msg: "If name is passed, it must be a string of at least length 1",
        check: name_nonempty_if_present,
    },
    Rule {
        param: "description",
        msg: "If description is passed, it must be a string of at least length 1",
        check: description_nonempty_if_present,
    },
    Rule {
        param: "quantity",
        msg: "If quantity is passed, it must be a positive integer",
        check: quantity_integer_if_present,
    },
    Rule {
        param: "image",
        msg: "If an image is passed, it must be an image file type",
        check: image_valid_if_present,
    },
];

fn run(rules: &[Rule], payload: &ItemPayload) -> Vec<FieldError> {
    rules
        .iter()
        .filter(|rule| !(rule.check)(payload))
        .map(|rule| FieldError::new(rule.msg, rule.param))
        .collect()
}

pub fn validate_create(payload: &ItemPayload) -> Vec<FieldError> {
    run(CREATE_RULES, payload)
}

pub fn validate_update(payload: &ItemPayload) -> Vec<FieldError> {
    run(UPDATE_RULES, payload)
}
