//! Property-Based Tests for the ETAF Context Core
//!
//! Allocator uniqueness, registry consistency, the GMM security guard,
//! additive context merge and the policy trigger tables.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use crate::config::EtafConfig;
    use crate::context::EtafContext;
    use crate::context_transfer::{
        am_policy_trigger_from_request, merge_from_ue_context_model,
        request_trigger_from_am_policy,
    };
    use crate::gmm_sm::{is_valid_transition, GmmFsm, GmmState};
    use crate::idgen::IdGenerator;
    use crate::models::{AccessType, AmPolicyReqTrigger, Guami, PlmnId, UeContext};
    use crate::ue::EtafUe;

    // ========================================================================
    // Strategies
    // ========================================================================

    fn arb_gmm_state() -> impl Strategy<Value = GmmState> {
        prop::sample::select(GmmState::ALL.to_vec())
    }

    fn arb_access_type() -> impl Strategy<Value = AccessType> {
        prop_oneof![
            Just(AccessType::ThreeGppAccess),
            Just(AccessType::NonThreeGppAccess),
        ]
    }

    fn arb_am_policy_trigger() -> impl Strategy<Value = AmPolicyReqTrigger> {
        prop_oneof![
            Just(AmPolicyReqTrigger::LocationChange),
            Just(AmPolicyReqTrigger::PraChange),
            Just(AmPolicyReqTrigger::SariChange),
            Just(AmPolicyReqTrigger::RfspIndexChange),
            Just(AmPolicyReqTrigger::AllowedNssaiChange),
        ]
    }

    /// Optional string field: empty means absent in the transfer payload
    fn arb_field() -> impl Strategy<Value = String> {
        prop_oneof![Just(String::new()), "[a-z0-9-]{1,16}"]
    }

    fn registry() -> EtafContext {
        EtafContext::new(EtafConfig {
            served_guami_list: vec![Guami {
                plmn_id: PlmnId::new("001", "01"),
                amf_id: "cafe00".to_string(),
            }],
            ..Default::default()
        })
    }

    // ========================================================================
    // Identifier Allocator
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Live IDs are unique and stay inside the range
        #[test]
        fn prop_idgen_live_ids_unique(ops in prop::collection::vec(any::<bool>(), 1..200)) {
            let idgen = IdGenerator::new(1, 32);
            let mut live: Vec<i64> = Vec::new();

            for allocate in ops {
                if allocate || live.is_empty() {
                    match idgen.allocate() {
                        Ok(id) => {
                            prop_assert!((1..=32).contains(&id));
                            prop_assert!(!live.contains(&id));
                            live.push(id);
                        }
                        Err(e) => {
                            prop_assert!(e.is_exhausted());
                            prop_assert_eq!(live.len(), 32);
                        }
                    }
                } else {
                    let id = live.remove(0);
                    prop_assert!(idgen.free(id).is_ok());
                    prop_assert!(idgen.free(id).is_err());
                }
            }
            prop_assert_eq!(idgen.allocated_count(), live.len());
        }
    }

    // ========================================================================
    // Registry
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Lookup by SUPI finds the UE until it is removed; its TMSI is freed
        #[test]
        fn prop_registry_supi_lookup_consistent(n in 1usize..20) {
            let ctx = registry();
            let ues: Vec<_> = (0..n)
                .map(|i| ctx.etaf_ue_add(Some(&format!("imsi-00101{:010}", i))).unwrap())
                .collect();

            let tmsis: HashSet<i32> = ues.iter().map(|ue| ue.read().tmsi).collect();
            prop_assert_eq!(tmsis.len(), n);

            for (i, ue) in ues.iter().enumerate() {
                let supi = format!("imsi-00101{:010}", i);
                let found = ctx.etaf_ue_find_by_supi(&supi);
                prop_assert!(found.is_some_and(|f| f.ptr_eq(ue)));

                let tmsi = ue.read().tmsi;
                ctx.etaf_ue_remove(ue).unwrap();
                prop_assert!(ctx.etaf_ue_find_by_supi(&supi).is_none());
                prop_assert!(!ctx.tmsi_generator().is_allocated(tmsi as i64));
            }
            prop_assert_eq!(ctx.etaf_ue_count(), 0);
        }
    }

    // ========================================================================
    // GMM State Machine
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Entering REGISTERED without a valid security context is never valid
        #[test]
        fn prop_gmm_registered_requires_security(from in arb_gmm_state()) {
            prop_assert!(!is_valid_transition(from, GmmState::Registered, false));
        }

        /// The FSM applies exactly the transitions the predicate accepts
        #[test]
        fn prop_gmm_fsm_follows_predicate(
            an in arb_access_type(),
            path in prop::collection::vec((arb_gmm_state(), any::<bool>()), 1..30),
        ) {
            let mut fsm = GmmFsm::new(an);
            for (to, valid) in path {
                let from = fsm.state();
                let result = fsm.transition(to, valid);
                prop_assert_eq!(result.is_ok(), is_valid_transition(from, to, valid));
                prop_assert_eq!(fsm.state(), if result.is_ok() { to } else { from });
            }
        }
    }

    // ========================================================================
    // Context Merge
    // ========================================================================

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Absent fields keep the local value, present fields overwrite it
        #[test]
        fn prop_merge_additive_only(
            local_pei in "[a-z0-9]{1,12}",
            local_pcf in "[a-z0-9]{1,12}",
            pei in arb_field(),
            pcf_id in arb_field(),
            rfsp in 0i32..4,
        ) {
            let mut ue = EtafUe::new();
            ue.pei = Some(local_pei.clone());
            ue.pcf_id = Some(local_pcf.clone());

            let model = UeContext {
                pei: pei.clone(),
                pcf_id: pcf_id.clone(),
                sub_rfsp: rfsp,
                ..Default::default()
            };
            merge_from_ue_context_model(&mut ue, &model).unwrap();

            let expected_pei = if pei.is_empty() { local_pei } else { pei };
            let expected_pcf = if pcf_id.is_empty() { local_pcf } else { pcf_id };
            prop_assert_eq!(ue.pei, Some(expected_pei));
            prop_assert_eq!(ue.pcf_id, Some(expected_pcf));
            prop_assert_eq!(
                ue.access_and_mobility_subscription_data.map(|d| d.rfsp_index),
                if rfsp == 0 { None } else { Some(rfsp) }
            );
        }

        /// Every mapped trigger converts back to itself
        #[test]
        fn prop_trigger_table_round_trip(trigger in arb_am_policy_trigger()) {
            if let Some(local) = request_trigger_from_am_policy(trigger) {
                prop_assert_eq!(am_policy_trigger_from_request(local), Some(trigger));
            } else {
                prop_assert_eq!(trigger, AmPolicyReqTrigger::AllowedNssaiChange);
            }
        }
    }
}
