//! End-to-end query tests: parsing, navigation, XPath, CSS, and typed
//! value extraction against small fixture documents.

use ono::{DateFormat, Document, NumberFormat, ParseOptions, Searching, Value};

const MENU: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<menu>
    <item id="1" class="breakfast favorite">
        <name>Waffles</name>
        <price>5.95</price>
        <added>2014-03-01T12:00:00Z</added>
    </item>
    <item id="2" class="breakfast">
        <name>Toast</name>
        <price>2.50</price>
        <added>2014-03-02T09:30:00Z</added>
    </item>
    <item id="3" class="lunch">
        <name>Soup</name>
        <price>4.00</price>
        <added>2014-03-03T11:00:00Z</added>
    </item>
</menu>"#;

#[test]
fn test_tree_integrity() {
    let doc = Document::parse_xml(MENU).unwrap();
    let root = doc.root_element();
    assert_eq!(root.tag(), "menu");
    assert!(root.parent().is_none());

    for item in root.children() {
        assert_eq!(item.parent(), Some(root));
        for child in item.children() {
            assert_eq!(child.parent(), Some(item));
        }
    }

    // Sibling chains agree with the child list.
    let items = root.children();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].next_sibling(), Some(items[1]));
    assert_eq!(items[1].previous_sibling(), Some(items[0]));
    assert_eq!(items[2].next_sibling(), None);
}

#[test]
fn test_parsing_is_deterministic() {
    let a = Document::parse_xml(MENU).unwrap();
    let b = Document::parse_xml(MENU).unwrap();

    let names_a: Vec<String> = a
        .xpath("//name")
        .unwrap()
        .map(|e| e.string_value())
        .collect();
    let names_b: Vec<String> = b
        .xpath("//name")
        .unwrap()
        .map(|e| e.string_value())
        .collect();
    assert_eq!(names_a, names_b);
    assert_eq!(names_a, vec!["Waffles", "Toast", "Soup"]);
}

#[test]
fn test_positional_predicate_is_per_name_test() {
    // b[2] selects the second b among b children, not the second child.
    let doc = Document::parse_xml("<a><b>one</b><c/><b>two</b></a>").unwrap();
    let matches = doc.xpath("a/b[2]").unwrap();
    assert_eq!(matches.len(), 1);
    assert_eq!(matches.first().unwrap().string_value(), "two");
}

#[test]
fn test_css_and_xpath_select_the_same_elements() {
    let doc = Document::parse_xml(MENU).unwrap();
    let pairs = [
        ("#2", "//*[@id='2']"),
        (".breakfast", "//*[contains(concat(' ', normalize-space(@class), ' '), ' breakfast ')]"),
        ("menu > item", "//menu/item"),
        ("item name", "//item//name"),
        ("name, price", "//name | //price"),
    ];
    for (css, xpath) in pairs {
        let via_css: Vec<_> = doc.css(css).unwrap().collect();
        let via_xpath: Vec<_> = doc.xpath(xpath).unwrap().collect();
        assert_eq!(via_css, via_xpath, "css {css:?} vs xpath {xpath:?}");
    }
}

#[test]
fn test_query_results_are_document_order() {
    let doc = Document::parse_xml(MENU).unwrap();
    let ids: Vec<_> = doc
        .xpath("//item[@class='lunch'] | //item[@id='1']")
        .unwrap()
        .map(|e| e.attribute("id").unwrap().to_string())
        .collect();
    assert_eq!(ids, vec!["1", "3"]);
}

#[test]
fn test_typed_values_with_default_formats() {
    let doc = Document::parse_xml("<r><n>42.5</n><d>2014-03-01T12:00:00Z</d></r>").unwrap();
    let n = doc.xpath("//n").unwrap().first().unwrap();
    assert_eq!(n.number_value(), Some(42.5));

    let d = doc.xpath("//d").unwrap().first().unwrap();
    let date = d.date_value().unwrap();
    assert_eq!(date.to_rfc3339(), "2014-03-01T12:00:00+00:00");
}

#[test]
fn test_typed_values_with_custom_formats() {
    let options = ParseOptions {
        number_format: NumberFormat::new(',', Some('.')),
        date_format: DateFormat::custom("%d/%m/%Y %H:%M"),
    };
    let doc = Document::parse_xml_with(
        b"<r><n>1.234,5</n><d>01/03/2014 12:00</d></r>",
        &options,
    )
    .unwrap();

    let n = doc.xpath("//n").unwrap().first().unwrap();
    assert_eq!(n.number_value(), Some(1234.5));

    let d = doc.xpath("//d").unwrap().first().unwrap();
    let date = d.date_value().unwrap();
    assert_eq!(date.to_rfc3339(), "2014-03-01T12:00:00+00:00");
}

#[test]
fn test_unparseable_values_are_none() {
    let doc = Document::parse_xml("<r><v>not a number</v></r>").unwrap();
    let v = doc.xpath("//v").unwrap().first().unwrap();
    assert_eq!(v.number_value(), None);
    assert_eq!(v.date_value(), None);
}

#[test]
fn test_blankness_is_deterministic() {
    let doc = Document::parse_xml("<r><a/><b>  \n </b><c>x</c><d><e/></d></r>").unwrap();
    for _ in 0..2 {
        let blank: Vec<bool> = doc
            .root_element()
            .children()
            .iter()
            .map(|e| e.is_blank())
            .collect();
        assert_eq!(blank, vec![true, true, false, true]);
    }
}

#[test]
fn test_namespaces_are_isolated() {
    let doc = Document::parse_xml(
        r#"<root xmlns:a="urn:one" xmlns:b="urn:two">
            <a:item/>
            <b:item/>
            <item/>
        </root>"#,
    )
    .unwrap();

    assert_eq!(doc.xpath("//a:item").unwrap().len(), 1);
    assert_eq!(doc.xpath("//b:item").unwrap().len(), 1);
    // An unprefixed test only sees the element with no namespace.
    assert_eq!(doc.xpath("//item").unwrap().len(), 1);
    assert_eq!(doc.xpath("//*").unwrap().len(), 4);
}

#[test]
fn test_default_namespace_documents_stay_queryable() {
    let doc = Document::parse_xml(r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>t</title></feed>"#)
        .unwrap();
    assert_eq!(doc.root_element().namespace(), Some("http://www.w3.org/2005/Atom"));
    assert_eq!(doc.xpath("//title").unwrap().len(), 1);
}

#[test]
fn test_empty_match_invokes_no_callback() {
    let doc = Document::parse_xml(MENU).unwrap();
    let mut calls = 0;
    doc.for_each_xpath("//absent", |_| calls += 1).unwrap();
    doc.for_each_css(".absent", |_| calls += 1).unwrap();
    assert_eq!(calls, 0);
}

#[test]
fn test_element_scoped_queries() {
    let doc = Document::parse_xml(MENU).unwrap();
    let first = doc.xpath("//item[1]").unwrap().first().unwrap();
    assert_eq!(first.xpath("name").unwrap().len(), 1);
    assert_eq!(first.css("name").unwrap().len(), 1);
    assert_eq!(
        first.evaluate("@class").unwrap().is_empty(),
        false
    );
}

#[test]
fn test_evaluate_produces_typed_results() {
    let doc = Document::parse_xml(MENU).unwrap();
    match doc.evaluate("count(//item)").unwrap() {
        Value::Number(n) => assert_eq!(n, 3.0),
        other => panic!("expected a number, got {other:?}"),
    }
    match doc.evaluate("//item/@id").unwrap() {
        Value::Strings(ids) => assert_eq!(ids, vec!["1", "2", "3"]),
        other => panic!("expected strings, got {other:?}"),
    }
    match doc.evaluate("//name/text()").unwrap() {
        Value::Strings(names) => assert_eq!(names, vec!["Waffles", "Toast", "Soup"]),
        other => panic!("expected strings, got {other:?}"),
    }
    match doc.evaluate("count(//item) = 3").unwrap() {
        Value::Boolean(b) => assert!(b),
        other => panic!("expected a boolean, got {other:?}"),
    }
}

#[test]
fn test_html_tag_soup_recovery() {
    let html = "<html><body><p>one<p>two<br><img src=x><ul><li>a<li>b</ul></body></html>";
    let doc = Document::parse_html(html).unwrap();
    assert_eq!(doc.xpath("//p").unwrap().len(), 2);
    assert_eq!(doc.xpath("//li").unwrap().len(), 2);
    assert_eq!(doc.css("img[src]").unwrap().len(), 1);
    // Void elements never swallow following content.
    assert!(doc.xpath("//br/*").unwrap().is_empty());
}

#[test]
fn test_html_implied_end_tags() {
    let doc = Document::parse_html("<ul><li>one<li>two</ul>").unwrap();
    assert!(doc.xpath("//li/li").unwrap().is_empty());
    let items: Vec<String> = doc
        .xpath("//ul/li")
        .unwrap()
        .map(|e| e.string_value())
        .collect();
    assert_eq!(items, vec!["one", "two"]);

    let doc = Document::parse_html("<body><p>one<p>two</body>").unwrap();
    assert!(doc.xpath("//p/p").unwrap().is_empty());
    assert_eq!(doc.xpath("//body/p").unwrap().len(), 2);

    // A new row implies the end of both the open cell and the open row.
    let doc = Document::parse_html("<table><tr><td>a<td>b<tr><td>c</table>").unwrap();
    assert_eq!(doc.xpath("//table/tr").unwrap().len(), 2);
    assert!(doc.xpath("//td/tr").unwrap().is_empty());
    assert_eq!(doc.xpath("//tr[1]/td").unwrap().len(), 2);
}

#[test]
fn test_html_entities_survive_where_xml_rejects() {
    assert!(Document::parse_xml("<p>fish &chips;</p>").is_err());
    let doc = Document::parse_html("<p>fish &amp; &chips;</p>").unwrap();
    assert_eq!(doc.root_element().string_value(), "fish & &chips;");
}

#[test]
fn test_selector_errors() {
    let doc = Document::parse_xml(MENU).unwrap();
    assert!(matches!(
        doc.xpath("//item["),
        Err(ono::Error::SelectorSyntax(_))
    ));
    assert!(matches!(
        doc.css("item:first-child"),
        Err(ono::Error::SelectorUnsupported(_))
    ));
    assert!(matches!(
        doc.css("item >"),
        Err(ono::Error::SelectorSyntax(_))
    ));
    // Text selections carry values, not elements; only evaluate() fits.
    assert!(matches!(
        doc.xpath("//name/text()"),
        Err(ono::Error::SelectorUnsupported(_))
    ));
}

#[test]
fn test_shared_across_threads() {
    let doc = Document::parse_xml(MENU).unwrap();
    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                let names: Vec<String> = doc
                    .xpath("//name")
                    .unwrap()
                    .map(|e| e.string_value())
                    .collect();
                assert_eq!(names, vec!["Waffles", "Toast", "Soup"]);
            });
        }
    });
}
