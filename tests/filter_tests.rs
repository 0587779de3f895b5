//! Filter and test plugin integration tests.
//!
//! Renders real templates through a fully registered environment to verify
//! the filters compose the way templates use them.

use minijinja::{context, Environment, Value};
use plugible::plugins::prelude::*;
use pretty_assertions::assert_eq;

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    FilterRegistry::register_all(&mut env);
    register_tests(&mut env);
    env
}

fn render(template: &str, ctx: Value) -> String {
    environment().render_str(template, ctx).unwrap()
}

#[test]
fn test_split_join_pipeline() {
    let out = render("{{ name | split_with('.') | join_with('_') }}", context! { name => "a.b.c" });
    assert_eq!(out, "a_b_c");
}

#[test]
fn test_head_tail_pipeline() {
    let out = render(
        "{{ hosts | tail | head }}",
        context! { hosts => vec!["web1", "web2", "web3"] },
    );
    assert_eq!(out, "web2");
}

#[test]
fn test_filename_and_with_ext() {
    assert_eq!(render("{{ 'db.example.org' | filename }}", context! {}), "db");
    assert_eq!(
        render("{{ 'config.yml' | with_ext('bak') }}", context! {}),
        "config.bak"
    );
}

fn address_record(host: &str, address: &str) -> Value {
    Value::from_iter([
        ("host", Value::from(host)),
        ("ip-address", Value::from(address)),
    ])
}

#[test]
fn test_merge_dicts_precedence() {
    let out = render(
        "{{ base | merge_dicts(overrides) | to_safe_yaml }}",
        context! {
            base => context! { port => 80, name => "web" },
            overrides => context! { port => 8080 },
        },
    );
    assert!(out.contains("port: 8080"));
    assert!(out.contains("name: web"));
}

#[test]
fn test_alias_keys_round_trip() {
    let out = render(
        "{{ record | alias_keys({'ip-address': 'address'}) | sorted_get(['address']) }}",
        context! { record => address_record("web1", "10.0.0.1") },
    );
    assert_eq!(out, "10.0.0.1");
}

#[test]
fn test_sorted_get_preference_order() {
    let out = render(
        "{{ record | sorted_get(['primary', 'fallback']) }}",
        context! { record => context! { fallback => "f" } },
    );
    assert_eq!(out, "f");
}

#[test]
fn test_map_format_on_dict() {
    let out = render(
        "{{ hosts | map_format({'name': '%s.example.org'}) | to_safe_yaml }}",
        context! { hosts => context! { name => "web1", id => 7 } },
    );
    assert!(out.contains("name: web1.example.org"));
}

#[test]
fn test_list_to_dict_and_back() {
    let out = render(
        "{{ records | list_to_dict('name') | dict_to_list('name') | to_safe_yaml }}",
        context! {
            records => vec![
                context! { name => "web1", port => 80 },
                context! { name => "web2", port => 81 },
            ],
        },
    );
    assert!(out.contains("name: web1"));
    assert!(out.contains("port: 81"));
}

#[test]
fn test_to_kv_flattening() {
    let out = render(
        "{% for kv in config | to_kv %}{{ kv.key }}={{ kv.value }};{% endfor %}",
        context! { config => context! { db => context! { host => "h", port => 5432 } } },
    );
    assert_eq!(out, "db.host=h;db.port=5432;");
}

#[test]
fn test_map_flatten_compound_keys() {
    let out = render(
        "{{ config | map_flatten | to_safe_yaml }}",
        context! { config => context! { a => context! { b => 1 }, c => 2 } },
    );
    assert!(out.contains("a.b: 1"));
    assert!(out.contains("c: 2"));
}

#[test]
fn test_map_group_by_attribute() {
    let out = render(
        "{% for g in servers | map_group(['dc']) %}{{ g.dc }}:{{ g.data | length }};{% endfor %}",
        context! {
            servers => vec![
                context! { dc => "ams", host => "h1" },
                context! { dc => "fra", host => "h2" },
                context! { dc => "ams", host => "h3" },
            ],
        },
    );
    assert_eq!(out, "ams:2;fra:1;");
}

#[test]
fn test_ip_range_expansion() {
    let out = render(
        "{{ '10.0.0.1-10.0.0.3' | ip_range | join_with(',') }}",
        context! {},
    );
    assert_eq!(out, "10.0.0.1,10.0.0.2,10.0.0.3");
}

#[test]
fn test_reverse_record_rendering() {
    let out = render(
        "{{ record | reverse_record | to_safe_yaml }}",
        context! { record => address_record("web.example.org", "10.1.2.3") },
    );
    assert!(out.contains("3.2.1.10.in-addr.arpa"));
    assert!(out.contains("type: PTR"));
}

#[test]
fn test_zone_fwd_rendering() {
    let out = render(
        "{{ 'example.org' | zone_fwd(['10.0.0.2']) | to_safe_yaml }}",
        context! {},
    );
    assert!(out.contains("zone \"example.org\" IN"));
    assert!(out.contains("forwarders"));
}

#[test]
fn test_boolean_folds() {
    assert_eq!(render("{{ [1, 0, 1] | is_any_true }}", context! {}), "true");
    assert_eq!(render("{{ [1, 0, 1] | is_all_true }}", context! {}), "false");
}

#[test]
fn test_search_regex_filter() {
    assert_eq!(
        render("{{ 'web-[0-9]+' | search_regex('web-01') }}", context! {}),
        "true"
    );
}

#[test]
fn test_network_test_selects_records() {
    let out = render(
        "{% for r in records | select('network', '10.0.0.0/8') %}{{ r.ansible_host }};{% endfor %}",
        context! {
            records => vec![
                context! { ansible_host => "10.1.2.3" },
                context! { ansible_host => "192.168.1.1" },
            ],
        },
    );
    assert_eq!(out, "10.1.2.3;");
}

#[test]
fn test_property_test_selects_records() {
    let out = render(
        "{% for r in records | select('property', 'web-.*', 'name') %}{{ r.name }};{% endfor %}",
        context! {
            records => vec![
                context! { name => "web-01" },
                context! { name => "db-01" },
            ],
        },
    );
    assert_eq!(out, "web-01;");
}

#[test]
fn test_missing_alias_source_errors() {
    let env = environment();
    let err = env
        .render_str(
            "{{ record | alias_keys({'missing': 'alias'}) }}",
            context! { record => context! { a => 1 } },
        )
        .unwrap_err();
    assert!(err.to_string().contains("not found"));
}
