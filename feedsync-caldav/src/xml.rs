//! Multistatus response parsing.

use anyhow::{Context, Result};
use roxmltree::{Document, Node};

const DAV_NS: &str = "DAV:";
const CALDAV_NS: &str = "urn:ietf:params:xml:ns:caldav";

/// A `<response>` for an event resource.
#[derive(Debug, Clone, PartialEq)]
pub struct EventResource {
    pub href: String,
    pub etag: Option<String>,
    pub data: String,
}

/// A `<response>` for a calendar collection.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionResource {
    pub href: String,
    pub display_name: Option<String>,
}

fn is(node: &Node, ns: &str, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(ns)
}

fn find<'a, 'input>(node: Node<'a, 'input>, ns: &str, name: &str) -> Option<Node<'a, 'input>> {
    node.descendants().find(|n| is(n, ns, name))
}

fn text(node: Option<Node>) -> Option<String> {
    node.and_then(|n| n.text())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn responses<'a, 'input>(doc: &'a Document<'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    doc.root_element()
        .children()
        .filter(|n| is(n, DAV_NS, "response"))
}

/// Event resources from a calendar-query REPORT.
/// Responses without calendar data are skipped.
pub fn parse_event_resources(body: &str) -> Result<Vec<EventResource>> {
    let doc = Document::parse(body).context("Invalid multistatus XML")?;

    let resources = responses(&doc)
        .filter_map(|response| {
            let href = text(find(response, DAV_NS, "href"))?;
            let etag = text(find(response, DAV_NS, "getetag"));
            // Calendar data must not be trimmed of its line structure, only surrounding blanks
            let data = find(response, CALDAV_NS, "calendar-data")
                .and_then(|n| n.text())
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())?;
            Some(EventResource { href, etag, data })
        })
        .collect();

    Ok(resources)
}

/// Calendar collections from a Depth 1 PROPFIND on a calendar home.
pub fn parse_calendar_collections(body: &str) -> Result<Vec<CollectionResource>> {
    let doc = Document::parse(body).context("Invalid multistatus XML")?;

    let collections = responses(&doc)
        .filter(|response| {
            find(*response, DAV_NS, "resourcetype")
                .is_some_and(|rt| rt.children().any(|n| is(&n, CALDAV_NS, "calendar")))
        })
        .filter_map(|response| {
            let href = text(find(response, DAV_NS, "href"))?;
            let display_name = text(find(response, DAV_NS, "displayname"));
            Some(CollectionResource { href, display_name })
        })
        .collect();

    Ok(collections)
}

/// The `<href>` inside the first property named `property`,
/// e.g. `current-user-principal` or `calendar-home-set`.
pub fn parse_href_property(body: &str, ns: PropertyNs, property: &str) -> Result<Option<String>> {
    let doc = Document::parse(body).context("Invalid multistatus XML")?;
    let ns = match ns {
        PropertyNs::Dav => DAV_NS,
        PropertyNs::CalDav => CALDAV_NS,
    };

    Ok(doc
        .descendants()
        .find(|n| is(n, ns, property))
        .and_then(|prop| text(find(prop, DAV_NS, "href"))))
}

#[derive(Debug, Clone, Copy)]
pub enum PropertyNs {
    Dav,
    CalDav,
}
