use vantage_api::codec::{self, Ordinal};
use vantage_api::interfaces::{HslAttribute, RgbChannel};
use vantage_api::{CommandClient, Event, Value};

use super::attr::{BLUE, COLOR, GREEN, HUE, LIGHTNESS, RED, SATURATION, WHITE};
use super::result_token;
use crate::controller::{AttributeUpdate, ControllerKind, FetchResult};
use crate::model::SystemObject;

/// Colour-capable loads, kept current from `RGBLoad.*` enhanced-log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct RgbLoads;

impl ControllerKind for RgbLoads {
    const NAME: &'static str = "rgb_loads";
    const OBJECT_TYPES: &'static [&'static str] = &["Vantage.DGColorLoad", "Vantage.DDGColorLoad"];
    const LOG_INTERFACES: &'static [&'static str] = &["RGBLoad"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        let Some(method) = event.method.as_deref() else {
            return Vec::new();
        };
        match method {
            // EL: <id> RGBLoad.GetRGB <value> <channel>
            "GetRGB" | "GetRGBW" => vec![channel_update(event)],
            // EL: <id> RGBLoad.GetHSL <value> <attribute>
            "GetHSL" => vec![hsl_update(event)],
            // EL: <id> RGBLoad.GetColor <packed>
            "GetColor" => vec![
                codec::decode::<i32>(result_token(event)).map(|c| (COLOR, Value::Int(i64::from(c)))),
            ],
            // EL: <id> RGBLoad.SetRGB <rcode> <red> <green> <blue>
            "SetRGB" | "DissolveRGB" => positional(event, &[RED, GREEN, BLUE]),
            "SetRGBW" => positional(event, &[RED, GREEN, BLUE, WHITE]),
            "SetHSL" | "DissolveHSL" => positional(event, &[HUE, SATURATION, LIGHTNESS]),
            _ => Vec::new(),
        }
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let rgb = client.rgb_load();
            let mut state = Vec::with_capacity(6);
            for channel in [RgbChannel::Red, RgbChannel::Green, RgbChannel::Blue] {
                let value = rgb.get_rgb(object.id, channel).await?;
                state.push((channel_attribute(channel), Value::Int(i64::from(value))));
            }
            for attribute in [HslAttribute::Hue, HslAttribute::Saturation, HslAttribute::Lightness] {
                let value = rgb.get_hsl(object.id, attribute).await?;
                state.push((hsl_attribute(attribute), Value::Int(i64::from(value))));
            }
            Ok(state)
        })
    }
}

fn channel_attribute(channel: RgbChannel) -> &'static str {
    match channel {
        RgbChannel::Red => RED,
        RgbChannel::Green => GREEN,
        RgbChannel::Blue => BLUE,
        RgbChannel::White => WHITE,
    }
}

fn hsl_attribute(attribute: HslAttribute) -> &'static str {
    match attribute {
        HslAttribute::Hue => HUE,
        HslAttribute::Saturation => SATURATION,
        HslAttribute::Lightness => LIGHTNESS,
    }
}

fn channel_update(event: &Event) -> AttributeUpdate {
    let Ordinal(channel) = event.arg::<Ordinal<RgbChannel>>(0)?;
    let value = codec::decode::<i64>(result_token(event))?;
    Ok((channel_attribute(channel), Value::Int(value.clamp(0, 255))))
}

fn hsl_update(event: &Event) -> AttributeUpdate {
    let Ordinal(attribute) = event.arg::<Ordinal<HslAttribute>>(0)?;
    let value = codec::decode::<i64>(result_token(event))?;
    Ok((hsl_attribute(attribute), Value::Int(value)))
}

/// Integer arguments in order, one attribute each.
fn positional(event: &Event, names: &[&'static str]) -> Vec<AttributeUpdate> {
    names
        .iter()
        .enumerate()
        .map(|(index, name)| event.arg::<i64>(index).map(|v| (*name, Value::Int(v))))
        .collect()
}
