use crate::codec::{FixedPoint, Ordinal};
use crate::command::CommandClient;
use crate::error::Error;
use crate::wire_args;

/// Colour channel selector; travels as its ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RgbChannel {
    Red,
    Green,
    Blue,
    White,
}

crate::ordinal_enum!(RgbChannel { 0 => Red, 1 => Green, 2 => Blue, 3 => White });

/// HSL attribute selector; travels as its ordinal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HslAttribute {
    Hue,
    Saturation,
    Lightness,
}

crate::ordinal_enum!(HslAttribute { 0 => Hue, 1 => Saturation, 2 => Lightness });

impl HslAttribute {
    fn max(self) -> i32 {
        match self {
            Self::Hue => 360,
            Self::Saturation | Self::Lightness => 100,
        }
    }
}

/// `RGBLoad.*` methods. Out-of-range inputs are clamped, never rejected.
pub struct RgbLoadInterface<'a> {
    client: &'a CommandClient,
}

impl<'a> RgbLoadInterface<'a> {
    pub fn new(client: &'a CommandClient) -> Self {
        Self { client }
    }

    pub async fn set_rgb(&self, id: u32, red: i32, green: i32, blue: i32) -> Result<(), Error> {
        let args = wire_args![channel(red), channel(green), channel(blue)];
        self.client.invoke(id, "RGBLoad.SetRGB", &args).await?;
        Ok(())
    }

    pub async fn set_rgbw(
        &self,
        id: u32,
        red: i32,
        green: i32,
        blue: i32,
        white: i32,
    ) -> Result<(), Error> {
        let args = wire_args![channel(red), channel(green), channel(blue), channel(white)];
        self.client.invoke(id, "RGBLoad.SetRGBW", &args).await?;
        Ok(())
    }

    /// Hue in degrees (0-360), saturation and lightness in percent.
    pub async fn set_hsl(
        &self,
        id: u32,
        hue: i32,
        saturation: i32,
        lightness: i32,
    ) -> Result<(), Error> {
        let args = wire_args![
            hue.clamp(0, 360),
            saturation.clamp(0, 100),
            lightness.clamp(0, 100)
        ];
        self.client.invoke(id, "RGBLoad.SetHSL", &args).await?;
        Ok(())
    }

    /// Transition to a colour over `rate` seconds.
    pub async fn dissolve_rgb(
        &self,
        id: u32,
        red: i32,
        green: i32,
        blue: i32,
        rate: FixedPoint,
    ) -> Result<(), Error> {
        let args = wire_args![channel(red), channel(green), channel(blue), rate];
        self.client.invoke(id, "RGBLoad.DissolveRGB", &args).await?;
        Ok(())
    }

    pub async fn dissolve_hsl(
        &self,
        id: u32,
        hue: i32,
        saturation: i32,
        lightness: i32,
        rate: FixedPoint,
    ) -> Result<(), Error> {
        let args = wire_args![
            hue.clamp(0, 360),
            saturation.clamp(0, 100),
            lightness.clamp(0, 100),
            rate
        ];
        self.client.invoke(id, "RGBLoad.DissolveHSL", &args).await?;
        Ok(())
    }

    pub async fn set_rgb_component(
        &self,
        id: u32,
        component: RgbChannel,
        value: i32,
    ) -> Result<(), Error> {
        let args = wire_args![Ordinal(component), channel(value)];
        self.client.invoke(id, "RGBLoad.SetRGBComponent", &args).await?;
        Ok(())
    }

    pub async fn set_hsl_attribute(
        &self,
        id: u32,
        attribute: HslAttribute,
        value: i32,
    ) -> Result<(), Error> {
        let args = wire_args![Ordinal(attribute), value.clamp(0, attribute.max())];
        self.client.invoke(id, "RGBLoad.SetHSLAttribute", &args).await?;
        Ok(())
    }

    /// One colour channel, 0-255.
    pub async fn get_rgb(&self, id: u32, component: RgbChannel) -> Result<u8, Error> {
        self.client
            .invoke(id, "RGBLoad.GetRGB", &wire_args![Ordinal(component)])
            .await?
            .result_as()
    }

    pub async fn get_rgbw(&self, id: u32, component: RgbChannel) -> Result<u8, Error> {
        self.client
            .invoke(id, "RGBLoad.GetRGBW", &wire_args![Ordinal(component)])
            .await?
            .result_as()
    }

    pub async fn get_hsl(&self, id: u32, attribute: HslAttribute) -> Result<i32, Error> {
        self.client
            .invoke(id, "RGBLoad.GetHSL", &wire_args![Ordinal(attribute)])
            .await?
            .result_as()
    }

    /// Packed colour as `[r, g, b, w]`.
    pub async fn get_color(&self, id: u32) -> Result<[u8; 4], Error> {
        let packed: i32 = self
            .client
            .invoke(id, "RGBLoad.GetColor", &[])
            .await?
            .result_as()?;
        Ok(packed.to_be_bytes())
    }
}

/// Clamp into a colour channel.
fn channel(value: i32) -> u8 {
    u8::try_from(value.clamp(0, 255)).unwrap_or(u8::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_clamps() {
        assert_eq!(channel(300), 255);
        assert_eq!(channel(-10), 0);
        assert_eq!(channel(128), 128);
    }

    #[test]
    fn hsl_bounds() {
        assert_eq!(HslAttribute::Hue.max(), 360);
        assert_eq!(HslAttribute::Lightness.max(), 100);
    }
}
