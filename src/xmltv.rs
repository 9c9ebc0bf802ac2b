use crate::config::ChannelConfig;
use crate::programme::Programme;
use anyhow::Context;
use chrono::{DateTime, FixedOffset};
use log::info;
use quick_xml::Writer;
use quick_xml::escape::partial_escape;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;
use std::path::Path;

const LANG: &str = "fr";

type XmlWriter = Writer<Vec<u8>>;

/// XMLTV timestamp: `YYYYMMDDHHMMSS +HHMM`.
pub fn xmltv_time(dt: &DateTime<FixedOffset>) -> String {
    dt.format("%Y%m%d%H%M%S %z").to_string()
}

/// Render the channel block and one `<programme>` per entry, in input order.
pub fn render(channel: &ChannelConfig, programmes: &[Programme]) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);

    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new("tv")))?;

    write_channel(&mut writer, channel)?;
    for programme in programmes {
        write_programme(&mut writer, &channel.id, programme)?;
    }

    writer.write_event(Event::End(BytesEnd::new("tv")))?;

    let mut xml = String::from_utf8(writer.into_inner()).context("XMLTV output is not UTF-8")?;
    xml.push('\n');

    info!("Generated EPG XML with {} programmes", programmes.len());
    Ok(xml)
}

/// Overwrite `path` with the rendered document.
pub fn write_listing(path: &Path, xml: &str) -> anyhow::Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("could not create {}", path.display()))?;
    file.write_all(xml.as_bytes())
        .with_context(|| format!("could not write {}", path.display()))?;
    info!("EPG saved to {}", path.display());
    Ok(())
}

fn write_channel(writer: &mut XmlWriter, channel: &ChannelConfig) -> anyhow::Result<()> {
    let mut start = BytesStart::new("channel");
    start.push_attribute(("id", channel.id.as_str()));
    writer.write_event(Event::Start(start))?;

    text_element(writer, "display-name", &[], &channel.name)?;
    text_element(writer, "display-name", &[], &channel.id)?;

    let mut icon = BytesStart::new("icon");
    icon.push_attribute(("src", channel.icon_url.as_str()));
    writer.write_event(Event::Empty(icon))?;

    writer.write_event(Event::End(BytesEnd::new("channel")))?;
    Ok(())
}

fn write_programme(
    writer: &mut XmlWriter,
    channel_id: &str,
    programme: &Programme,
) -> anyhow::Result<()> {
    let start_time = programme.start_time();
    let start_attr = xmltv_time(&start_time);
    let stop_attr = xmltv_time(&programme.end_time());

    let mut start = BytesStart::new("programme");
    start.push_attribute(("start", start_attr.as_str()));
    start.push_attribute(("stop", stop_attr.as_str()));
    start.push_attribute(("channel", channel_id));
    writer.write_event(Event::Start(start))?;

    let lang = [("lang", LANG)];
    text_element(writer, "title", &lang, programme.title())?;
    text_element(writer, "desc", &lang, programme.description())?;

    writer.write_event(Event::Start(BytesStart::new("credits")))?;
    match programme {
        Programme::Single(m) => {
            text_element(writer, "presenter", &[], &m.home_team)?;
            text_element(writer, "guest", &[], &m.away_team)?;
        }
        Programme::Multiplex(mx) => {
            for m in mx.matches() {
                text_element(writer, "presenter", &[], &m.fixture())?;
            }
        }
    }
    writer.write_event(Event::End(BytesEnd::new("credits")))?;

    text_element(writer, "category", &lang, "Sport")?;
    text_element(writer, "category", &lang, "Football")?;
    if !programme.championship().is_empty() {
        text_element(writer, "category", &lang, programme.championship())?;
    }
    if let Programme::Multiplex(_) = programme {
        text_element(writer, "category", &lang, "Multiplex")?;
    }

    let air_date = start_time.format("%Y-%m-%d").to_string();
    text_element(writer, "episode-num", &[("system", "original-air-date")], &air_date)?;

    // Sport is always general audience.
    let mut rating = BytesStart::new("rating");
    rating.push_attribute(("system", "MPAA"));
    writer.write_event(Event::Start(rating))?;
    text_element(writer, "value", &[], "G")?;
    writer.write_event(Event::End(BytesEnd::new("rating")))?;

    writer.write_event(Event::End(BytesEnd::new("programme")))?;
    Ok(())
}

fn text_element(
    writer: &mut XmlWriter,
    name: &str,
    attrs: &[(&str, &str)],
    text: &str,
) -> anyhow::Result<()> {
    let mut start = BytesStart::new(name);
    for &attr in attrs {
        start.push_attribute(attr);
    }
    writer.write_event(Event::Start(start))?;
    writer.write_event(Event::Text(BytesText::from_escaped(partial_escape(text))))?;
    writer.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}
