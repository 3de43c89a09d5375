//! Unit tests for sa-core primitives.

#[cfg(test)]
mod ids {
    use crate::{ConnectorId, GroupKey};

    #[test]
    fn connector_index_and_display() {
        let id = ConnectorId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(id.to_string(), "ConnectorId(42)");
    }

    #[test]
    fn group_key_ordering_is_total() {
        let mut keys = vec![
            GroupKey::Text("b".into()),
            GroupKey::Int(7),
            GroupKey::Implicit,
            GroupKey::Int(-1),
            GroupKey::Text("a".into()),
        ];
        keys.sort();
        assert_eq!(
            keys,
            vec![
                GroupKey::Implicit,
                GroupKey::Int(-1),
                GroupKey::Int(7),
                GroupKey::Text("a".into()),
                GroupKey::Text("b".into()),
            ]
        );
    }

    #[test]
    fn output_names() {
        assert_eq!(GroupKey::Int(12).output_name(), "grp_12_servArea");
        assert_eq!(GroupKey::Implicit.output_name(), "grp_all_servArea");
        assert_eq!(
            GroupKey::Text("Blue Ridge / Pkwy".into()).output_name(),
            "grp_Blue_Ridge_Pkwy_servArea"
        );
    }
}

#[cfg(test)]
mod grid {
    use crate::{CellPos, Envelope, GridSpec, WorldPoint};

    /// 10 × 5 grid of 2-unit cells anchored at (100, 200).
    fn spec() -> GridSpec {
        GridSpec::new(10, 5, 100.0, 200.0, 2.0)
    }

    #[test]
    fn cell_of_and_center_agree() {
        let g = spec();
        // Top-left cell.
        assert_eq!(g.cell_of(WorldPoint::new(100.5, 209.5)), Some(CellPos::new(0, 0)));
        // Bottom-right cell.
        assert_eq!(g.cell_of(WorldPoint::new(119.9, 200.1)), Some(CellPos::new(4, 9)));
        let c = g.center(CellPos::new(2, 3));
        assert_eq!(c, WorldPoint::new(107.0, 205.0));
        assert_eq!(g.cell_of(c), Some(CellPos::new(2, 3)));
    }

    #[test]
    fn outside_points_have_no_cell() {
        let g = spec();
        assert_eq!(g.cell_of(WorldPoint::new(99.9, 205.0)), None);
        assert_eq!(g.cell_of(WorldPoint::new(120.0, 205.0)), None); // right edge
        assert_eq!(g.cell_of(WorldPoint::new(110.0, 200.0)), None); // bottom edge
        assert_eq!(g.cell_of(WorldPoint::new(f64::NAN, 205.0)), None);
    }

    #[test]
    fn window_snaps_outward_and_clamps() {
        let g = spec();
        let env = Envelope { min_x: 103.0, min_y: 203.0, max_x: 106.5, max_y: 207.0 };
        let w = g.window_for(&env).unwrap();
        // cols floor(1.5)=1 .. ceil(3.25)=4, rows floor(1.5)=1 .. ceil(3.5)=4
        assert_eq!((w.col0, w.ncols, w.row0, w.nrows), (1, 3, 1, 3));

        let huge = Envelope { min_x: 0.0, min_y: 0.0, max_x: 1e6, max_y: 1e6 };
        assert_eq!(g.window_for(&huge), Some(g.full_window()));

        let disjoint = Envelope { min_x: 500.0, min_y: 500.0, max_x: 600.0, max_y: 600.0 };
        assert_eq!(g.window_for(&disjoint), None);
    }

    #[test]
    fn sub_spec_keeps_cell_centres() {
        let g = spec();
        let env = Envelope { min_x: 103.0, min_y: 203.0, max_x: 106.5, max_y: 207.0 };
        let w = g.window_for(&env).unwrap();
        let sub = g.sub_spec(&w);
        let parent = CellPos::new(2, 2);
        let local = w.to_local(parent).unwrap();
        assert_eq!(sub.center(local), g.center(parent));
        assert_eq!(w.to_parent(local), parent);
        assert_eq!(w.to_local(CellPos::new(0, 0)), None);
    }

    #[test]
    fn buffered_envelope() {
        let pts = [WorldPoint::new(1.0, 2.0), WorldPoint::new(3.0, -1.0)];
        let env = Envelope::from_points(&pts).unwrap().buffered(1.0);
        assert_eq!(env, Envelope { min_x: 0.0, min_y: -2.0, max_x: 4.0, max_y: 3.0 });
        assert!(Envelope::from_points(&[]).is_none());
    }
}

#[cfg(test)]
mod raster {
    use crate::{CellPos, CostSurface, GridSpec, GridWindow, Raster, Sheet};

    fn spec() -> GridSpec {
        GridSpec::new(3, 2, 0.0, 0.0, 1.0)
    }

    #[test]
    fn no_data_round_trip() {
        let r = Raster::from_values(
            spec(),
            vec![Some(1.0), None, Some(3.0), Some(f64::INFINITY), Some(5.0), Some(6.0)],
        )
        .unwrap();
        assert_eq!(r.get(CellPos::new(0, 0)), Some(1.0));
        assert_eq!(r.get(CellPos::new(0, 1)), None);
        // Non-finite input is treated as no-data.
        assert_eq!(r.get(CellPos::new(1, 0)), None);
        assert_eq!(r.defined_count(), 4);
        assert_eq!(r.max_value(), Some(6.0));
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(Raster::from_values(spec(), vec![Some(1.0)]).is_err());
    }

    #[test]
    fn equality_treats_no_data_as_equal() {
        let a = Raster::empty(spec());
        let b = Raster::empty(spec());
        assert_eq!(a, b);
        let mut c = b.clone();
        c.set(CellPos::new(1, 2), Some(0.5));
        assert_ne!(a, c);
    }

    #[test]
    fn crop_copies_window() {
        let r = Raster::from_values(
            spec(),
            (0..6).map(|v| Some(v as f64)).collect(),
        )
        .unwrap();
        let w = GridWindow { row0: 0, col0: 1, nrows: 2, ncols: 2 };
        let c = r.crop(&w);
        let vals: Vec<_> = c.values().collect();
        assert_eq!(vals, vec![Some(1.0), Some(2.0), Some(4.0), Some(5.0)]);
        assert_eq!(c.spec().xll, 1.0);
    }

    #[test]
    fn map_defined_keeps_no_data() {
        let r = Raster::from_values(spec(), vec![Some(1.4), None, Some(2.6), None, None, None])
            .unwrap();
        let m = r.map_defined(|v| Some(v.round()));
        assert_eq!(m.values().collect::<Vec<_>>()[..3], [Some(1.0), None, Some(3.0)]);
    }

    #[test]
    fn surface_rejects_non_positive_cost() {
        let bad = Raster::filled(spec(), 0.0);
        assert!(CostSurface::new(Sheet::Local, bad).is_err());
        let ok = Raster::filled(spec(), 2.0);
        let s = CostSurface::new(Sheet::Highway, ok).unwrap();
        assert_eq!(s.sheet(), Sheet::Highway);
    }
}

#[cfg(test)]
mod features {
    use std::collections::BTreeSet;

    use crate::{AttrValue, Connector, ConnectorId, ConnectorSet, GroupKey, Origin, WorldPoint};

    #[test]
    fn attr_parsing() {
        assert_eq!(AttrValue::parse(" 12 "), AttrValue::Number(12.0));
        assert_eq!(AttrValue::parse("river"), AttrValue::Text("river".into()));
        assert_eq!(AttrValue::parse("NaN"), AttrValue::Text("NaN".into()));
        assert_eq!(AttrValue::Number(12.0).to_group_key(), GroupKey::Int(12));
        assert_eq!(AttrValue::Number(1.5).to_group_key(), GroupKey::Text("1.5".into()));
    }

    #[test]
    fn origin_number_errors() {
        let o = Origin::new(WorldPoint::new(0.0, 0.0))
            .with_attr("score", AttrValue::Number(3.0))
            .with_attr("name", AttrValue::Text("x".into()));
        assert_eq!(o.number("score").unwrap(), 3.0);
        assert!(matches!(o.number("missing"), Err(crate::SaError::MissingField { .. })));
        assert!(matches!(o.number("name"), Err(crate::SaError::Parse(_))));
    }

    #[test]
    fn connectors_group_by_id() {
        let set = ConnectorSet::new(vec![
            Connector { id: ConnectorId(2), point: WorldPoint::new(9.0, 9.0) },
            Connector { id: ConnectorId(1), point: WorldPoint::new(0.0, 0.0) },
            Connector { id: ConnectorId(1), point: WorldPoint::new(5.0, 5.0) },
        ]);
        assert_eq!(set.ids(), BTreeSet::from([ConnectorId(1), ConnectorId(2)]));
        let grouped = set.by_id();
        assert_eq!(grouped.keys().copied().collect::<Vec<_>>(), [ConnectorId(1), ConnectorId(2)]);
        assert_eq!(grouped[&ConnectorId(1)], [WorldPoint::new(0.0, 0.0), WorldPoint::new(5.0, 5.0)]);
        assert_eq!(grouped[&ConnectorId(2)], [WorldPoint::new(9.0, 9.0)]);
        assert!(ConnectorSet::default().by_id().is_empty());
    }
}

#[cfg(test)]
mod config {
    use crate::{AttrValue, MaxCost, Origin, RunConfig, ValuePolicy, WorldPoint};

    fn base() -> RunConfig {
        RunConfig::new("out", "origins.csv", "local.asc", "hwy.asc", "ramps.csv", "UniqueID")
    }

    #[test]
    fn default_config_is_valid() {
        base().validate().unwrap();
    }

    #[test]
    fn constant_policy_requires_cutoff() {
        let mut c = base();
        c.value_policy = ValuePolicy::ConstantValue(7.0);
        assert!(c.validate().is_err());
        c.max_cost = MaxCost::Constant(20.0);
        c.validate().unwrap();

        let mut f = base();
        f.value_policy = ValuePolicy::ConstantFromField("score".into());
        assert!(f.validate().is_err());
    }

    #[test]
    fn bad_numbers_rejected() {
        let mut c = base();
        c.max_cost = MaxCost::Constant(-5.0);
        assert!(c.validate().is_err());

        let mut t = base();
        t.solver.tolerance = f64::NAN;
        assert!(t.validate().is_err());

        let mut s = base();
        s.solver.max_speed = 0.0;
        assert!(s.validate().is_err());

        let mut n = base();
        n.num_threads = Some(0);
        assert!(n.validate().is_err());
    }

    #[test]
    fn score_curve_cutoff() {
        let mc = MaxCost::ScoreCurve {
            field:       "score".into(),
            coefficient: 30.0,
            offset:      1.5,
            cap:         60.0,
        };
        let low = Origin::new(WorldPoint::new(0.0, 0.0)).with_attr("score", AttrValue::Number(8.5));
        // 30 · log10(10) = 30
        assert_eq!(mc.origin_cost(&low).unwrap(), Some(30.0));
        let high = Origin::new(WorldPoint::new(0.0, 0.0)).with_attr("score", AttrValue::Number(1e6));
        assert_eq!(mc.origin_cost(&high).unwrap(), Some(60.0));
    }

    #[test]
    fn field_cutoff_is_rounded() {
        let mc = MaxCost::Field("minutes".into());
        let o = Origin::new(WorldPoint::new(0.0, 0.0)).with_attr("minutes", AttrValue::Number(12.345));
        assert_eq!(mc.origin_cost(&o).unwrap(), Some(12.3));
        let zero = Origin::new(WorldPoint::new(0.0, 0.0)).with_attr("minutes", AttrValue::Number(0.0));
        assert!(mc.origin_cost(&zero).is_err());
    }

    #[test]
    fn canonical_ignores_paths() {
        let a = base();
        let mut b = base();
        b.output = "elsewhere".into();
        assert_eq!(a.canonical(), b.canonical());
        b.solver.tolerance = 0.5;
        assert_ne!(a.canonical(), b.canonical());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip() {
        let json = r#"{
            "output": "out",
            "origins": "o.csv",
            "local_surface": "l.asc",
            "highway_surface": "h.asc",
            "connectors": "r.csv",
            "connector_id_field": "UniqueID",
            "group_field": "join_fid",
            "max_cost": { "constant": 60.0 },
            "value_policy": { "constant_from_field": "join_score" }
        }"#;
        let c: RunConfig = serde_json::from_str(json).unwrap();
        assert_eq!(c.max_cost, MaxCost::Constant(60.0));
        assert_eq!(c.value_policy, ValuePolicy::ConstantFromField("join_score".into()));
        assert_eq!(c.solver.tolerance, 1.0);
        c.validate().unwrap();
    }
}
