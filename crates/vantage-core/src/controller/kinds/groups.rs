// ── Load and blind groups ──
//
// Groups implement the same interfaces as their members, so their state
// is read with the member getters. `S:LOAD` and `S:BLIND` belong to the
// member controllers; groups follow the `Load.*` and `Blind.*` lines of
// the enhanced log instead.

use vantage_api::codec::WireType;
use vantage_api::{CommandClient, Event, FixedPoint, Value};

use super::attr::{LEVEL, POSITION};
use super::{Loads, reported_token};
use crate::controller::{AttributeUpdate, Controller, ControllerKind, FetchResult};
use crate::error::CoreError;
use crate::model::{ObjectId, SystemObject};
use crate::query::QueryView;

/// Catalog property listing a load group's member load ids.
pub const LOAD_TABLE: &str = "load_table";

/// Ids listed in a catalog property, separated by commas or whitespace.
/// Tokens that are not ids are skipped.
fn member_ids(object: &SystemObject, key: &str) -> Vec<ObjectId> {
    object
        .property(key)
        .map(|table| {
            table
                .split(|c: char| c == ',' || c.is_whitespace())
                .filter_map(|token| token.parse().ok())
                .collect()
        })
        .unwrap_or_default()
}

/// A fixed-point attribute reported by `Get<property>` or echoed by
/// `Set<property>`.
fn logged_fixed(event: &Event, property: &str, name: &'static str) -> Vec<AttributeUpdate> {
    let logged = event
        .method
        .as_deref()
        .and_then(|m| m.strip_prefix("Get").or_else(|| m.strip_prefix("Set")));
    if logged != Some(property) {
        return Vec::new();
    }
    vec![FixedPoint::decode(reported_token(event)).map(|v| (name, Value::Fixed(v)))]
}

// ── LoadGroups ───────────────────────────────────────────────────────

/// Load groups. Holds the loads controller so a group can be expanded
/// into a live view over its members.
#[derive(Clone)]
pub struct LoadGroups {
    loads: Controller<Loads>,
}

impl LoadGroups {
    pub fn new(loads: Controller<Loads>) -> Self {
        Self { loads }
    }
}

impl ControllerKind for LoadGroups {
    const NAME: &'static str = "load_groups";
    const OBJECT_TYPES: &'static [&'static str] = &["LoadGroup"];
    const LOG_INTERFACES: &'static [&'static str] = &["Load"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        logged_fixed(event, "Level", LEVEL)
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let level = client.load().get_level(object.id).await?;
            Ok(vec![(LEVEL, Value::Fixed(level))])
        })
    }
}

impl Controller<LoadGroups> {
    /// Member load ids from the group's `load_table`.
    pub fn member_ids(&self, group: ObjectId) -> Result<Vec<ObjectId>, CoreError> {
        let object = self
            .get(group)
            .ok_or(CoreError::ObjectNotFound { id: group })?;
        Ok(member_ids(&object, LOAD_TABLE))
    }

    /// Live view over the loads in `group`. Membership is read now; the
    /// members' state stays live.
    pub fn loads(&self, group: ObjectId) -> Result<QueryView, CoreError> {
        let members = self.member_ids(group)?;
        Ok(self
            .kind()
            .loads
            .filter(move |load| members.contains(&load.id)))
    }

    pub async fn set_level(&self, id: ObjectId, level: FixedPoint) -> Result<(), CoreError> {
        if !self.contains(id) {
            return Err(CoreError::ObjectNotFound { id });
        }
        self.client().load().set_level(id, level).await?;
        Ok(())
    }

    pub async fn turn_on(&self, id: ObjectId) -> Result<(), CoreError> {
        self.set_level(id, FixedPoint::from_int(100)).await
    }

    pub async fn turn_off(&self, id: ObjectId) -> Result<(), CoreError> {
        self.set_level(id, FixedPoint::ZERO).await
    }
}

// ── BlindGroups ──────────────────────────────────────────────────────

/// Blind groups, including Somfy group children.
#[derive(Debug, Default, Clone, Copy)]
pub struct BlindGroups;

impl ControllerKind for BlindGroups {
    const NAME: &'static str = "blind_groups";
    const OBJECT_TYPES: &'static [&'static str] = &[
        "BlindGroup",
        "Somfy.RS-485_Group_CHILD",
        "Somfy.URTSI_2_Group_CHILD",
    ];
    const LOG_INTERFACES: &'static [&'static str] = &["Blind"];

    fn decode_event(&self, event: &Event) -> Vec<AttributeUpdate> {
        logged_fixed(event, "Position", POSITION)
    }

    fn fetch_state<'a>(
        &'a self,
        client: &'a CommandClient,
        object: &'a SystemObject,
    ) -> FetchResult<'a> {
        Box::pin(async move {
            let position = client.blind().get_position(object.id, false).await?;
            Ok(vec![(POSITION, Value::Fixed(position))])
        })
    }
}

impl Controller<BlindGroups> {
    pub async fn open(&self, id: ObjectId) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().open(id).await?)
    }

    pub async fn close(&self, id: ObjectId) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().close(id).await?)
    }

    pub async fn stop(&self, id: ObjectId) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().stop(id).await?)
    }

    pub async fn set_position(&self, id: ObjectId, position: FixedPoint) -> Result<(), CoreError> {
        self.known(id)?;
        Ok(self.client().blind().set_position(id, position).await?)
    }

    fn known(&self, id: ObjectId) -> Result<(), CoreError> {
        if self.contains(id) {
            Ok(())
        } else {
            Err(CoreError::ObjectNotFound { id })
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use vantage_api::events::parse_line;
    use vantage_api::{ConnectionConfig, Connector, EventStream, ReconnectConfig};

    use crate::model::ObjectInfo;

    fn offline<K: ControllerKind>(kind: K) -> Controller<K> {
        let connector = Connector::new(ConnectionConfig::new("127.0.0.1")).unwrap();
        let client = CommandClient::new(connector.clone(), Duration::from_secs(1));
        let stream = EventStream::new(connector, ReconnectConfig::default());
        Controller::new(kind, client, stream)
    }

    #[test]
    fn group_level_comes_from_load_log_lines() {
        let get = parse_line("EL: 20 Load.GetLevel 40.000").unwrap().unwrap();
        assert_eq!(
            logged_fixed(&get, "Level", LEVEL),
            vec![Ok((LEVEL, Value::Fixed(FixedPoint::from_int(40))))]
        );

        let set = parse_line("EL: 20 Load.SetLevel 0 75.500").unwrap().unwrap();
        assert_eq!(
            logged_fixed(&set, "Level", LEVEL),
            vec![Ok((LEVEL, Value::Fixed(FixedPoint::from_thousandths(75_500))))]
        );

        let ramp = parse_line("EL: 20 Load.Ramp 0 6 100.000").unwrap().unwrap();
        assert!(logged_fixed(&ramp, "Level", LEVEL).is_empty());
    }

    #[test]
    fn blind_group_position_is_decoded() {
        let event = parse_line("EL: 30 Blind.GetPosition 25.000").unwrap().unwrap();
        assert_eq!(
            BlindGroups.decode_event(&event),
            vec![Ok((POSITION, Value::Fixed(FixedPoint::from_int(25))))]
        );
    }

    #[tokio::test]
    async fn group_expands_to_a_live_view_of_member_loads() {
        let loads = offline(Loads);
        let groups = offline(LoadGroups::new(loads.clone()));
        loads.load_catalog([
            ObjectInfo::new(1, "Load"),
            ObjectInfo::new(2, "Load"),
            ObjectInfo::new(3, "Load"),
        ]);
        groups.load_catalog([
            ObjectInfo::new(20, "LoadGroup").with_property(LOAD_TABLE, "1, 3 99 x"),
            ObjectInfo::new(21, "LoadGroup"),
        ]);

        assert_eq!(groups.member_ids(20).unwrap(), vec![1, 3, 99]);
        let members = groups.loads(20).unwrap();
        assert_eq!(members.ids(), vec![1, 3]);
        assert!(groups.loads(21).unwrap().is_empty());

        loads.update_state(3, [(LEVEL, Value::Fixed(FixedPoint::from_int(60)))]);
        assert_eq!(
            members.get(3).unwrap().fixed(LEVEL),
            Some(FixedPoint::from_int(60))
        );

        assert!(matches!(
            groups.loads(404),
            Err(CoreError::ObjectNotFound { id: 404 })
        ));
    }

    #[tokio::test]
    async fn unknown_group_is_rejected_before_the_wire() {
        let groups = offline(BlindGroups);
        assert!(matches!(
            groups.open(5).await,
            Err(CoreError::ObjectNotFound { id: 5 })
        ));
    }
}
