#[cfg(test)]
mod _tests_context {
    use crate::config::Thresholds;
    use crate::context::{AnalysisContext, Context, ContextState};
    use crate::engine::{MsymContext, NativeContext};
    use crate::error::ErrorKind;
    use crate::interfaces::PointGroupName;
    use crate::molecule::{BasisFunction, Element};
    use crate::status::ReturnCode;
    use crate::symmetries::{Orientation, SymmetryOperation, SymmetryOperationKind};
    use nalgebra::Vector3;
    use std::f64::consts::PI;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn init_logger() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn atom(name: &str, x: f64, y: f64, z: f64) -> Element {
        Element::new(name, Vector3::new(x, y, z)).unwrap()
    }

    fn water() -> Vec<Element> {
        vec![
            atom("O", 0.0, 0.0, 0.0),
            atom("H", 0.0, 0.757, 0.587),
            atom("H", 0.0, -0.757, 0.587),
        ]
    }

    fn linear() -> Vec<Element> {
        vec![
            atom("O", 0.0, 0.0, 0.0),
            atom("H", 0.0, 0.0, 1.0),
            atom("H", 0.0, 0.0, -1.0),
        ]
    }

    fn tetrahedron() -> Vec<Element> {
        vec![
            atom("C", 0.0, 0.0, 0.0),
            atom("H", 1.0, 1.0, 1.0),
            atom("H", 1.0, -1.0, -1.0),
            atom("H", -1.0, 1.0, -1.0),
            atom("H", -1.0, -1.0, 1.0),
        ]
    }

    fn benzene() -> Vec<Element> {
        let mut atoms = Vec::new();
        for k in 0..6 {
            let phi = PI * k as f64 / 3.0;
            atoms.push(atom("C", 1.39 * phi.cos(), 1.39 * phi.sin(), 0.0));
            atoms.push(atom("H", 2.47 * phi.cos(), 2.47 * phi.sin(), 0.0));
        }
        atoms
    }

    fn hydrogen_s(elements: &[Element]) -> Vec<BasisFunction> {
        elements
            .iter()
            .filter(|e| e.name() == "H")
            .map(|e| BasisFunction::real_spherical_harmonic(e, 1, 0, 0, "1s").unwrap())
            .collect()
    }

    type Descriptor = (SymmetryOperationKind, u32, u32, Orientation);

    fn descriptors(operations: &[SymmetryOperation]) -> Vec<Descriptor> {
        let mut d: Vec<Descriptor> = operations
            .iter()
            .map(|op| (op.kind(), op.order(), op.power(), op.orientation()))
            .collect();
        d.sort();
        d
    }

    #[test]
    fn test_installed_elements_preserve_values_and_order() {
        init_logger();
        let mut context = Context::create().unwrap();
        assert_eq!(context.state(), ContextState::Created);
        let input = benzene();
        let installed = context.install_elements(&input).unwrap();
        assert_eq!(installed.len(), input.len());
        for (a, b) in installed.iter().zip(&input) {
            assert_eq!(a, b);
            assert!(a.id().is_some());
        }
        assert_eq!(context.state(), ContextState::ElementsSet);
    }

    #[test]
    fn test_water_pipeline() {
        init_logger();
        let mut context = Context::create().unwrap();
        let elements = context.install_elements(&water()).unwrap().to_vec();
        context.install_basis_functions(&hydrogen_s(&elements)).unwrap();
        assert_eq!(context.state(), ContextState::BasisSet);

        assert_eq!(context.find_symmetry().unwrap(), "C2v");
        assert_eq!(context.point_group().unwrap(), Some("C2v"));
        assert_eq!(context.symmetry_operations().unwrap().len(), 4);
        assert_eq!(context.state(), ContextState::PointGroupKnown);

        context.symmetrize_elements().unwrap();
        assert_eq!(context.state(), ContextState::Symmetrized);

        context.generate_salc_subspaces().unwrap();
        assert_eq!(context.state(), ContextState::SubspacesGenerated);
        let subspaces = context.native().unwrap().salc_subspaces();
        assert_eq!(subspaces.len(), 2);
        assert!(subspaces[0].is_totally_symmetric());
    }

    #[test]
    fn test_basis_functions_are_rebound_to_installed_copies() {
        let mut context = Context::create().unwrap();
        let input = water();
        context.install_elements(&input).unwrap();
        // References built from the caller's own values match by value
        let installed = context.install_basis_functions(&hydrogen_s(&input)).unwrap().to_vec();
        assert_eq!(installed.len(), 2);
        for (bf, expected) in installed.iter().zip(&input[1..]) {
            let element = context.element_of(bf).unwrap().unwrap();
            assert_eq!(element, expected);
            assert_eq!(bf.bound_element(), element.id());
        }
        // Already bound functions are accepted again
        context.install_basis_functions(&installed).unwrap();
        assert_eq!(context.basis_functions().unwrap().len(), 2);
    }

    #[test]
    fn test_bound_basis_survives_reinstalling_elements() {
        let mut context = Context::create().unwrap();
        let input = tetrahedron();
        context.install_elements(&input).unwrap();
        let bound = context.install_basis_functions(&hydrogen_s(&input)).unwrap().to_vec();
        assert_eq!(bound.len(), 4);

        let reinstalled = context.install_elements(&input).unwrap().to_vec();
        assert!(context.basis_functions().unwrap().is_empty());
        let rebound = context.install_basis_functions(&bound).unwrap().to_vec();
        assert_eq!(rebound.len(), 4);
        for (bf, expected) in rebound.iter().zip(&reinstalled[1..]) {
            assert_eq!(bf.bound_element(), expected.id());
        }

        // Same values in another order still resolve to the right element
        let mut shuffled = input.clone();
        shuffled.swap(1, 4);
        let reordered = context.install_elements(&shuffled).unwrap().to_vec();
        let rebound = context.install_basis_functions(&rebound).unwrap().to_vec();
        assert_eq!(rebound[0].bound_element(), reordered[4].id());
        assert_eq!(rebound[3].bound_element(), reordered[1].id());

        // References two element sets back are gone
        context.install_elements(&input).unwrap();
        context.install_elements(&input).unwrap();
        let err = context.install_basis_functions(&bound).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBasis);
    }

    #[test]
    fn test_bound_basis_does_not_follow_moved_elements() {
        let mut context = Context::create().unwrap();
        let input = water();
        context.install_elements(&input).unwrap();
        let bound = context.install_basis_functions(&hydrogen_s(&input)).unwrap().to_vec();

        let mut moved = input.clone();
        moved[1].coordinates.z += 0.1;
        moved[2].coordinates.z += 0.1;
        context.install_elements(&moved).unwrap();
        let err = context.install_basis_functions(&bound).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBasis);
    }

    #[test]
    fn test_unknown_element_reference_keeps_basis() {
        let mut context = Context::create().unwrap();
        let elements = context.install_elements(&water()).unwrap().to_vec();
        context.install_basis_functions(&hydrogen_s(&elements)).unwrap();
        let before = context.basis_functions().unwrap().to_vec();

        let stranger = atom("H", 5.0, 5.0, 5.0);
        let bad = BasisFunction::real_spherical_harmonic(&stranger, 1, 0, 0, "1s").unwrap();
        let err = context.install_basis_functions(&[bad]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBasis);
        assert!(!err.is_contract_violation());

        let after = context.basis_functions().unwrap();
        assert_eq!(after.len(), before.len());
        for (a, b) in after.iter().zip(&before) {
            assert_eq!(a.id(), b.id());
        }
    }

    #[test]
    fn test_engine_errors_carry_details() {
        let mut context = Context::create().unwrap();
        context.install_elements(&water()).unwrap();
        let err = context.set_point_group("D6h").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PointGroupError);
        assert_eq!(err.description(), "Error determining point group");
        assert!(err.details().contains("D6h"));
        assert_eq!(context.point_group().unwrap(), None);

        let err = context.install_elements(&[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidElements);
        assert!(!err.details().is_empty());
    }

    #[test]
    fn test_non_ascii_point_group_name() {
        let mut context = Context::create().unwrap();
        context.install_elements(&water()).unwrap();
        let err = context.set_point_group("C₂v").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = context.set_point_group("C2vvvvvv").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_set_point_group_refreshes_operations() {
        let mut context = Context::create().unwrap();
        context.install_elements(&benzene()).unwrap();
        context.set_point_group("C6v").unwrap();
        assert_eq!(context.point_group().unwrap(), Some("C6v"));
        assert_eq!(context.symmetry_operations().unwrap().len(), 12);
        // Detection keeps the requested group
        assert_eq!(context.find_symmetry().unwrap(), "C6v");
    }

    #[test]
    fn test_linear_detection_is_deterministic() {
        let mut context = Context::create().unwrap();
        context.install_elements(&linear()).unwrap();
        let first = context.find_symmetry().unwrap().to_owned();
        let first_ops = descriptors(context.symmetry_operations().unwrap());
        assert_eq!(first, "D0h");
        assert!(first_ops
            .iter()
            .any(|d| d.0 == SymmetryOperationKind::Inversion));
        assert!(first_ops
            .iter()
            .any(|d| d.0 == SymmetryOperationKind::ProperRotation && d.1 == 2));

        let mut again = Context::create().unwrap();
        again.install_elements(&linear()).unwrap();
        assert_eq!(again.find_symmetry().unwrap(), first);
        assert_eq!(descriptors(again.symmetry_operations().unwrap()), first_ops);
    }

    #[test]
    fn test_tetrahedron_has_24_operations() {
        let mut context = Context::create().unwrap();
        context.install_elements(&tetrahedron()).unwrap();
        assert_eq!(context.find_symmetry().unwrap(), "Td");
        assert_eq!(context.symmetry_operations().unwrap().len(), 24);
    }

    #[test]
    fn test_failed_set_point_group_keeps_previous_group() {
        let mut context = Context::create().unwrap();
        context.install_elements(&tetrahedron()).unwrap();
        context.find_symmetry().unwrap();
        let operations = descriptors(context.symmetry_operations().unwrap());

        let err = context.set_point_group("D6h").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PointGroupError);
        assert_eq!(context.point_group().unwrap(), Some("Td"));
        assert_eq!(context.symmetry_operations().unwrap().len(), 24);
        assert_eq!(descriptors(context.symmetry_operations().unwrap()), operations);
        assert_eq!(context.state(), ContextState::PointGroupKnown);
    }

    #[test]
    fn test_find_symmetry_is_idempotent() {
        let mut context = Context::create().unwrap();
        context.install_elements(&benzene()).unwrap();
        let first = context.find_symmetry().unwrap().to_owned();
        let first_ops = descriptors(context.symmetry_operations().unwrap());
        let second = context.find_symmetry().unwrap().to_owned();
        assert_eq!(first, "D6h");
        assert_eq!(first, second);
        assert_eq!(descriptors(context.symmetry_operations().unwrap()), first_ops);
    }

    #[test]
    fn test_symmetrize_is_noop_on_symmetric_input() {
        let mut context = Context::create().unwrap();
        let input = tetrahedron();
        context.install_elements(&input).unwrap();
        context.find_symmetry().unwrap();
        let symmetrized = context.symmetrize_elements().unwrap();
        assert_eq!(symmetrized.len(), input.len());
        for (a, b) in symmetrized.iter().zip(&input) {
            assert_eq!(a.name(), b.name());
            assert!((a.coordinates - b.coordinates).norm() < 1e-10);
        }
    }

    #[test]
    fn test_symmetrize_corrects_noise() {
        let mut context = Context::create().unwrap();
        let mut input = tetrahedron();
        input[2].coordinates += Vector3::new(2e-4, 0.0, -1e-4);
        context.install_elements(&input).unwrap();
        assert_eq!(context.find_symmetry().unwrap(), "Td");
        let symmetrized = context.symmetrize_elements().unwrap().to_vec();
        let center = symmetrized[0].coordinates;
        let distances: Vec<f64> = symmetrized[1..]
            .iter()
            .map(|e| (e.coordinates - center).norm())
            .collect();
        for d in &distances {
            assert!((d - distances[0]).abs() < 1e-10);
        }
        assert!(context.native().unwrap().symmetrization_error().is_some());
        // Symmetric output is stable under detection
        assert_eq!(context.find_symmetry().unwrap(), "Td");
    }

    #[test]
    fn test_operations_need_their_preconditions() {
        let mut context = Context::create().unwrap();
        let h = atom("H", 0.0, 0.0, 0.0);
        let bf = BasisFunction::real_spherical_harmonic(&h, 1, 0, 0, "1s").unwrap();

        let err = context.install_basis_functions(&[bf]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert!(err.is_contract_violation());
        assert_eq!(context.find_symmetry().unwrap_err().kind(), ErrorKind::Precondition);
        assert_eq!(context.set_point_group("C2v").unwrap_err().kind(), ErrorKind::Precondition);

        context.install_elements(&water()).unwrap();
        assert_eq!(
            context.symmetrize_elements().unwrap_err().kind(),
            ErrorKind::Precondition
        );
        assert_eq!(
            context.generate_salc_subspaces().unwrap_err().kind(),
            ErrorKind::Precondition
        );

        context.find_symmetry().unwrap();
        // Point group known, but no basis
        let err = context.generate_salc_subspaces().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidBasis);
        assert!(!err.is_contract_violation());
    }

    #[test]
    fn test_install_elements_discards_derived_state() {
        let mut context = Context::create().unwrap();
        let elements = context.install_elements(&water()).unwrap().to_vec();
        context.install_basis_functions(&hydrogen_s(&elements)).unwrap();
        context.find_symmetry().unwrap();

        context.install_elements(&benzene()).unwrap();
        assert_eq!(context.state(), ContextState::ElementsSet);
        assert!(context.basis_functions().unwrap().is_empty());
        assert_eq!(context.point_group().unwrap(), None);
        assert!(context.symmetry_operations().unwrap().is_empty());
    }

    #[test]
    fn test_with_runs_the_first_stages() {
        let input = water();
        let mut context = Context::with(&input, &hydrogen_s(&input), None).unwrap();
        assert_eq!(context.point_group().unwrap(), None);
        assert_eq!(context.state(), ContextState::BasisSet);
        assert_eq!(context.basis_functions().unwrap().len(), 2);
        assert_eq!(context.find_symmetry().unwrap(), "C2v");

        let context = Context::with(&input, &[], Some("Cs")).unwrap();
        assert_eq!(context.point_group().unwrap(), Some("Cs"));
        assert_eq!(context.symmetry_operations().unwrap().len(), 2);
    }

    #[test]
    fn test_thresholds_from_json() {
        let mut context = Context::create().unwrap();
        assert_eq!(context.thresholds().unwrap(), Thresholds::default());

        let thresholds: Thresholds = serde_json::from_str(r#"{"permutation": 0.01}"#).unwrap();
        assert_eq!(thresholds.zero, Thresholds::default().zero);
        context.set_thresholds(&thresholds).unwrap();
        assert_eq!(context.thresholds().unwrap().permutation, 0.01);

        let invalid: Thresholds = serde_json::from_str(r#"{"angle": -1.0}"#).unwrap();
        let err = context.set_thresholds(&invalid).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidThreshold);
        assert!(err.details().contains("angle"));
        assert_eq!(context.thresholds().unwrap().permutation, 0.01);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut context = Context::create().unwrap();
        context.install_elements(&water()).unwrap();
        context.find_symmetry().unwrap();
        context.release();
        assert!(context.is_released());
        assert_eq!(context.state(), ContextState::Released);
        context.release();

        for err in [
            context.elements().unwrap_err(),
            context.basis_functions().unwrap_err(),
            context.point_group().unwrap_err(),
            context.symmetry_operations().unwrap_err(),
            context.install_elements(&water()).unwrap_err(),
            context.find_symmetry().unwrap_err(),
            context.generate_salc_subspaces().unwrap_err(),
        ] {
            assert_eq!(err.kind(), ErrorKind::Precondition);
            assert!(err.is_contract_violation());
        }
        assert!(context.native().is_err());
    }

    // Engines for exercising the context's handle management

    struct Unavailable;

    impl NativeContext for Unavailable {
        fn create() -> Option<Self> {
            None
        }
        fn release(self) -> ReturnCode {
            ReturnCode::Success
        }
        fn set_thresholds(&mut self, _: &Thresholds) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn get_thresholds(&self) -> Result<&Thresholds, ReturnCode> {
            Err(ReturnCode::InvalidContext)
        }
        fn set_elements(&mut self, _: &[Element]) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn get_elements(&self) -> Result<&[Element], ReturnCode> {
            Err(ReturnCode::InvalidContext)
        }
        fn set_basis_functions(&mut self, _: &[BasisFunction]) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn get_basis_functions(&self) -> Result<&[BasisFunction], ReturnCode> {
            Err(ReturnCode::InvalidContext)
        }
        fn set_point_group_by_name(&mut self, _: &PointGroupName) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn get_point_group_name(&self, _: &mut [u8]) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn find_symmetry(&mut self) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn get_symmetry_operations(&self) -> Result<&[SymmetryOperation], ReturnCode> {
            Err(ReturnCode::InvalidContext)
        }
        fn symmetrize_elements(&mut self) -> ReturnCode {
            ReturnCode::InvalidContext
        }
        fn generate_salc_subspaces(&mut self) -> ReturnCode {
            ReturnCode::InvalidContext
        }
    }

    static RELEASED: AtomicUsize = AtomicUsize::new(0);

    /// Accepts everything and counts releases.
    #[derive(Default)]
    struct Counting {
        thresholds: Thresholds,
        elements: Vec<Element>,
    }

    impl NativeContext for Counting {
        fn create() -> Option<Self> {
            Some(Self::default())
        }
        fn release(self) -> ReturnCode {
            RELEASED.fetch_add(1, Ordering::SeqCst);
            ReturnCode::InvalidContext
        }
        fn set_thresholds(&mut self, thresholds: &Thresholds) -> ReturnCode {
            self.thresholds = *thresholds;
            ReturnCode::Success
        }
        fn get_thresholds(&self) -> Result<&Thresholds, ReturnCode> {
            Ok(&self.thresholds)
        }
        fn set_elements(&mut self, elements: &[Element]) -> ReturnCode {
            self.elements = elements.to_vec();
            ReturnCode::Success
        }
        fn get_elements(&self) -> Result<&[Element], ReturnCode> {
            Ok(&self.elements)
        }
        fn set_basis_functions(&mut self, _: &[BasisFunction]) -> ReturnCode {
            ReturnCode::Success
        }
        fn get_basis_functions(&self) -> Result<&[BasisFunction], ReturnCode> {
            Ok(&[])
        }
        fn set_point_group_by_name(&mut self, _: &PointGroupName) -> ReturnCode {
            ReturnCode::Success
        }
        fn get_point_group_name(&self, buffer: &mut [u8]) -> ReturnCode {
            buffer.fill(0);
            buffer[..2].copy_from_slice(b"C1");
            ReturnCode::Success
        }
        fn find_symmetry(&mut self) -> ReturnCode {
            ReturnCode::Success
        }
        fn get_symmetry_operations(&self) -> Result<&[SymmetryOperation], ReturnCode> {
            Ok(&[])
        }
        fn symmetrize_elements(&mut self) -> ReturnCode {
            ReturnCode::Success
        }
        fn generate_salc_subspaces(&mut self) -> ReturnCode {
            ReturnCode::Success
        }
    }

    /// Built-in engine whose detection fails after the first success.
    #[derive(Debug)]
    struct DetectsOnce {
        inner: MsymContext,
        detections: usize,
    }

    impl NativeContext for DetectsOnce {
        fn create() -> Option<Self> {
            Some(Self {
                inner: MsymContext::create()?,
                detections: 0,
            })
        }
        fn release(self) -> ReturnCode {
            self.inner.release()
        }
        fn set_thresholds(&mut self, thresholds: &Thresholds) -> ReturnCode {
            self.inner.set_thresholds(thresholds)
        }
        fn get_thresholds(&self) -> Result<&Thresholds, ReturnCode> {
            self.inner.get_thresholds()
        }
        fn set_elements(&mut self, elements: &[Element]) -> ReturnCode {
            self.inner.set_elements(elements)
        }
        fn get_elements(&self) -> Result<&[Element], ReturnCode> {
            self.inner.get_elements()
        }
        fn set_basis_functions(&mut self, basis_functions: &[BasisFunction]) -> ReturnCode {
            self.inner.set_basis_functions(basis_functions)
        }
        fn get_basis_functions(&self) -> Result<&[BasisFunction], ReturnCode> {
            self.inner.get_basis_functions()
        }
        fn set_point_group_by_name(&mut self, name: &PointGroupName) -> ReturnCode {
            self.inner.set_point_group_by_name(name)
        }
        fn get_point_group_name(&self, buffer: &mut [u8]) -> ReturnCode {
            self.inner.get_point_group_name(buffer)
        }
        fn find_symmetry(&mut self) -> ReturnCode {
            self.detections += 1;
            if self.detections > 1 {
                return crate::fail!(
                    ReturnCode::SymmetryError,
                    "detection {} refused",
                    self.detections
                );
            }
            self.inner.find_symmetry()
        }
        fn get_symmetry_operations(&self) -> Result<&[SymmetryOperation], ReturnCode> {
            self.inner.get_symmetry_operations()
        }
        fn symmetrize_elements(&mut self) -> ReturnCode {
            self.inner.symmetrize_elements()
        }
        fn generate_salc_subspaces(&mut self) -> ReturnCode {
            self.inner.generate_salc_subspaces()
        }
    }

    #[test]
    fn test_failed_find_symmetry_keeps_previous_group() {
        let mut context = AnalysisContext::<DetectsOnce>::create().unwrap();
        context.install_elements(&tetrahedron()).unwrap();
        assert_eq!(context.find_symmetry().unwrap(), "Td");
        let operations = descriptors(context.symmetry_operations().unwrap());

        let err = context.find_symmetry().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SymmetryError);
        assert!(err.details().contains("refused"));
        assert_eq!(context.point_group().unwrap(), Some("Td"));
        assert_eq!(context.symmetry_operations().unwrap().len(), 24);
        assert_eq!(descriptors(context.symmetry_operations().unwrap()), operations);
    }

    #[test]
    fn test_engine_without_resources() {
        let err = AnalysisContext::<Unavailable>::create().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resource);
    }

    #[test]
    fn test_handle_released_exactly_once() {
        init_logger();
        let before = RELEASED.load(Ordering::SeqCst);
        {
            let mut context = AnalysisContext::<Counting>::create().unwrap();
            context.install_elements(&water()).unwrap();
            assert_eq!(context.find_symmetry().unwrap(), "C1");
            context.release();
            context.release();
        }
        {
            let _dropped = AnalysisContext::<Counting>::create().unwrap();
        }
        assert_eq!(RELEASED.load(Ordering::SeqCst), before + 2);
    }
}
