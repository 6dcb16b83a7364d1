//! Built-in banking catalog and scenario selection.
use anyhow::{Context, Result};
use bankqa_core::{Catalog, CatalogNode, NodeKind, TestCase, TestStatus};
use std::path::Path;

const BROWSERS: [&str; 4] = ["chrome", "firefox", "safari", "edge"];
const BREAKPOINTS: [&str; 4] = ["mobile", "tablet", "desktop", "large"];

/// Load a catalog from JSON, or fall back to the built-in sample.
pub fn load_catalog(path: Option<&Path>) -> Result<Catalog> {
    let Some(path) = path else {
        return sample_catalog();
    };
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read catalog {}", path.display()))?;
    Catalog::from_json(&json).with_context(|| format!("invalid catalog {}", path.display()))
}

pub fn sample_catalog() -> Result<Catalog> {
    let root = CatalogNode::new("bankqa", "Banking QA Dashboard", NodeKind::Application)
        .with_child(functional_tab())
        .with_child(ui_components_tab())
        .with_child(security_tab())
        .with_child(CatalogNode::matrix(
            "cross-browser",
            "Cross Browser",
            &[
                ("xb-input", "Input Box"),
                ("xb-checkbox", "Checkbox"),
                ("xb-dropdown", "Dropdown"),
            ],
            &BROWSERS,
        ))
        .with_child(CatalogNode::matrix(
            "responsive",
            "Responsive",
            &[
                ("resp-layout", "Layout"),
                ("resp-fonts", "Font sizes"),
                ("resp-touch", "Touch targets"),
            ],
            &BREAKPOINTS,
        ));
    Ok(Catalog::new(root)?)
}

fn functional_tab() -> CatalogNode {
    CatalogNode::new("functional", "Functional Flows", NodeKind::Tab)
        .with_child(
            CatalogNode::new("login", "Customer Login", NodeKind::Component)
                .with_test(
                    TestCase::new("FT-LOGIN-01", "Login with valid credentials")
                        .with_steps([
                            "Open the login page",
                            "Enter customer ID and password",
                            "Submit the form",
                            "Land on the accounts overview",
                        ])
                        .with_expected("Dashboard shows the customer's accounts"),
                )
                .with_test(
                    TestCase::new("FT-LOGIN-02", "Lock account after three failed attempts")
                        .with_steps([
                            "Enter a wrong password",
                            "Repeat twice more",
                            "Try the correct password",
                            "Check the lockout banner",
                        ])
                        .with_expected("Account locked and customer told to call support"),
                ),
        )
        .with_child(
            CatalogNode::new("transfer", "Fund Transfer", NodeKind::Component)
                .with_test(
                    TestCase::new("FT-TRF-01", "Transfer within the daily limit")
                        .with_steps([
                            "Open fund transfer",
                            "Pick a saved beneficiary",
                            "Enter an amount under the limit",
                            "Confirm with OTP",
                            "Check both balances",
                        ])
                        .with_expected("Debit and credit posted, reference number issued"),
                )
                .with_test(
                    TestCase::new("FT-TRF-02", "Reject a transfer above the daily limit")
                        .with_steps([
                            "Open fund transfer",
                            "Enter an amount above the limit",
                            "Submit",
                        ])
                        .with_expected("Limit error shown and nothing debited")
                        .with_outcome(TestStatus::Fail),
                ),
        )
        .with_child(
            CatalogNode::new("bill-pay", "Bill Payments", NodeKind::Component).with_test(
                TestCase::new("FT-BILL-01", "Pay a registered biller")
                    .with_steps(["Open bill payments", "Choose the biller", "Pay the due amount"])
                    .with_expected("Receipt generated and biller marked paid"),
            ),
        )
}

fn ui_components_tab() -> CatalogNode {
    fn category(id: &str, title: &str, cases: &[(&str, &str, &str)]) -> CatalogNode {
        cases.iter().fold(
            CatalogNode::new(id, title, NodeKind::Category),
            |node, (case_id, desc, expected)| {
                node.with_test(TestCase::new(*case_id, *desc).with_expected(*expected))
            },
        )
    }

    CatalogNode::new("ui", "UI Components", NodeKind::Tab)
        .with_child(
            CatalogNode::new("input-box", "Input Box (Text Field)", NodeKind::Component)
                .with_child(category(
                    "input-box-positive",
                    "Positive",
                    &[
                        ("inp-p1", "Enter valid text in input field", "Text appears correctly in the field"),
                        ("inp-p2", "Enter text up to max length", "Input accepts text up to maxLength"),
                    ],
                ))
                .with_child(category(
                    "input-box-negative",
                    "Negative",
                    &[
                        ("inp-n1", "Enter <script>alert(1)</script>", "Input sanitized, no script execution"),
                        ("inp-n2", "Submit with empty required field", "Validation error shown, form not submitted"),
                    ],
                )),
        )
        .with_child(
            CatalogNode::new("checkbox", "Checkbox", NodeKind::Component)
                .with_child(category(
                    "checkbox-positive",
                    "Positive",
                    &[
                        ("chk-p1", "Check and uncheck a checkbox", "Checkbox toggles between states"),
                        ("chk-p2", "Toggle checkbox with Space key", "Pressing Space toggles the state"),
                    ],
                ))
                .with_child(category(
                    "checkbox-negative",
                    "Negative",
                    &[("chk-n1", "Click on disabled checkbox", "No state change")],
                )),
        )
        .with_child(
            CatalogNode::new("dropdown", "Dropdown / Select Box", NodeKind::Component).with_child(
                category(
                    "dropdown-functional",
                    "Functional",
                    &[
                        ("drp-f1", "onChange fires on selection", "Handler called with selected value"),
                        ("drp-p3", "Navigate options with arrow keys", "Arrows move the highlight"),
                    ],
                ),
            ),
        )
}

fn security_tab() -> CatalogNode {
    CatalogNode::new("security", "Security", NodeKind::Tab).with_child(
        CatalogNode::new("session-security", "Session Security", NodeKind::Component)
            .with_test(
                TestCase::new("SEC-01", "SQL injection in login is neutralised")
                    .with_steps([
                        "Enter ' OR '1'='1 as customer ID",
                        "Submit the login form",
                        "Inspect the audit log entry",
                    ])
                    .with_expected("Login refused and attempt audited"),
            )
            .with_test(
                TestCase::new("SEC-02", "Idle session expires")
                    .with_steps([
                        "Log in",
                        "Stay idle past the timeout",
                        "Click any menu item",
                        "Check the redirect",
                    ])
                    .with_expected("Redirected to login with a session-expired notice"),
            )
            .with_test(
                TestCase::new("SEC-03", "Account numbers masked on statements")
                    .with_steps(["Download a statement", "Inspect account numbers"])
                    .with_expected("Only the last four digits are visible"),
            ),
    )
}

/// `(test id, title)` for every test, depth first.
pub fn list_scenarios(catalog: &Catalog) -> Vec<(String, String)> {
    catalog
        .all_tests()
        .into_iter()
        .map(|test| (test.id.clone(), test.title.clone()))
        .collect()
}

/// Resolve a selection of test ids, node ids or `all` into test ids.
///
/// Returns the ids in selection order without duplicates, plus any tokens
/// that matched nothing.
pub fn expand_selection(catalog: &Catalog, tokens: &[String]) -> (Vec<String>, Vec<String>) {
    fn push(id: &str, ids: &mut Vec<String>) {
        if !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    }

    let mut ids: Vec<String> = Vec::new();
    let mut unknown = Vec::new();
    for token in tokens {
        if token.eq_ignore_ascii_case("all") {
            for test in catalog.all_tests() {
                push(&test.id, &mut ids);
            }
        } else if let Some(test) = catalog.find_test(token) {
            push(&test.id, &mut ids);
        } else if let Some(node) = catalog.find_node(token) {
            for test in node.all_tests() {
                push(&test.id, &mut ids);
            }
        } else {
            unknown.push(token.clone());
        }
    }
    (ids, unknown)
}
