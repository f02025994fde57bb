#[cfg(test)]
mod _tests_molecule {
    use super::super::basis_function::{
        BasisFunction, BasisFunctionType, ElementRef, RealSphericalHarmonic,
    };
    use super::super::element::{Element, ElementId};
    use crate::error::ErrorKind;
    use nalgebra::Vector3;

    #[test]
    fn test_element_new_uses_standard_mass() {
        let o = Element::new("O", Vector3::new(0.0, 0.0, 0.1)).unwrap();
        assert_eq!(o.name(), "O");
        assert!((o.mass - 15.999).abs() < 1e-9);
        assert_eq!(o.charge, 0);
        assert!(o.id().is_none());

        let ghost = Element::new("X", Vector3::zeros()).unwrap();
        assert_eq!(ghost.mass, 0.0);
    }

    #[test]
    fn test_element_name_is_limited_to_three_ascii_characters() {
        let err = Element::new("Oxyg", Vector3::zeros()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        let err = Element::new("Ö", Vector3::zeros()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_element_equality_ignores_identity() {
        let a = Element::new("H", Vector3::new(1.0, 0.0, 0.0)).unwrap();
        let mut b = a.clone();
        b.set_id(ElementId::issue());
        assert_eq!(a, b);

        let c = a.clone().with_charge(1);
        assert_ne!(a, c);
        assert!(!a.same_type(&c, 1e-6));
        assert!(a.same_type(&b, 1e-6));
    }

    #[test]
    fn test_basis_function_starts_unbound() {
        let h = Element::new("H", Vector3::new(0.0, 0.0, 1.0)).unwrap();
        let bf = BasisFunction::real_spherical_harmonic(&h, 1, 0, 0, "1s").unwrap();
        assert_eq!(bf.name(), "1s");
        assert_eq!(bf.function_type(), BasisFunctionType::RealSphericalHarmonic);
        assert_eq!(bf.element_ref(), &ElementRef::Unbound(h.clone()));
        assert_eq!(bf.bound_element(), None);
        assert_eq!(
            bf.real_spherical_harmonic_parameters(),
            Some(RealSphericalHarmonic::new(1, 0, 0))
        );
    }

    #[test]
    fn test_basis_function_binding() {
        let c = Element::new("C", Vector3::zeros()).unwrap();
        let mut bf = BasisFunction::real_spherical_harmonic(&c, 2, 1, -1, "2py").unwrap();
        let id = ElementId::issue();
        bf.bind(id);
        assert_eq!(bf.bound_element(), Some(id));
        bf.set_element(&c);
        assert_eq!(bf.bound_element(), None);
    }

    #[test]
    fn test_bound_basis_function_serializes() {
        let c = Element::new("C", Vector3::new(0.0, 0.0, 1.2)).unwrap();
        let mut bf = BasisFunction::real_spherical_harmonic(&c, 2, 1, 0, "2pz").unwrap();
        bf.bind(ElementId::issue());
        let json = serde_json::to_string(&bf).unwrap();
        let back: BasisFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.bound_element(), bf.bound_element());
        assert_eq!(back.name(), "2pz");

        let unbound = BasisFunction::real_spherical_harmonic(&c, 2, 1, 0, "2pz").unwrap();
        let json = serde_json::to_string(&unbound).unwrap();
        let back: BasisFunction = serde_json::from_str(&json).unwrap();
        assert_eq!(back.element_ref(), &ElementRef::Unbound(c));
    }

    #[test]
    fn test_real_spherical_harmonic_validity() {
        assert!(RealSphericalHarmonic::new(1, 0, 0).is_valid());
        assert!(RealSphericalHarmonic::new(3, 2, -2).is_valid());
        assert!(!RealSphericalHarmonic::new(1, 1, 0).is_valid());
        assert!(!RealSphericalHarmonic::new(2, 1, 2).is_valid());
        assert!(!RealSphericalHarmonic::new(0, 0, 0).is_valid());
    }

    #[test]
    fn test_basis_function_name_limit() {
        let c = Element::new("C", Vector3::zeros()).unwrap();
        let err = BasisFunction::real_spherical_harmonic(&c, 3, 2, 0, "3dz2long").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }
}
